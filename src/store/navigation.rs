use serde::Serialize;

use super::{generate_id, LoadState};
use crate::types::{now_rfc3339, CreateNavigation, Navigation, UpdateNavigation};

/// Filters for plain listings (not keyword search)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListFilters {
    pub featured: bool,
    pub tags: Vec<String>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum NavigationCommand {
    /// Replace all items with freshly loaded data
    Loaded(Vec<Navigation>),
    LoadFailed(String),
    Create(CreateNavigation),
    Update { id: String, changes: UpdateNavigation },
    Delete(String),
    IncrementVisit(String),
    SetCategoryFilter(Option<String>),
    SetPage(usize),
    SetPageSize(usize),
    SetQuery { query: String, filters: ListFilters },
    ClearQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    Loaded { count: usize },
    LoadFailed(String),
    Created(Navigation),
    Updated(Navigation),
    Deleted(String),
    VisitCounted { id: String, visit_count: u64 },
    NotFound(String),
    ViewChanged,
}

/// Navigation items plus the current listing view
#[derive(Debug, Clone)]
pub struct NavigationStore {
    items: Vec<Navigation>,
    load_state: LoadState,
    total: usize,
    page: usize,
    page_size: usize,
    selected_category: Option<String>,
    query: String,
    filters: ListFilters,
}

impl Default for NavigationStore {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            load_state: LoadState::Idle,
            total: 0,
            page: 1,
            page_size: 20,
            selected_category: None,
            query: String::new(),
            filters: ListFilters::default(),
        }
    }
}

impl NavigationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: NavigationCommand) -> NavigationEvent {
        match command {
            NavigationCommand::Loaded(items) => {
                self.total = items.len();
                self.items = items;
                self.load_state = LoadState::Loaded;
                NavigationEvent::Loaded { count: self.total }
            }
            NavigationCommand::LoadFailed(message) => {
                tracing::warn!("Failed to load navigation data: {}", message);
                self.load_state = LoadState::Failed(message.clone());
                NavigationEvent::LoadFailed(message)
            }
            NavigationCommand::Create(input) => {
                let id = generate_id("nav", |id| self.items.iter().any(|n| n.id == id));
                let now = now_rfc3339();
                let navigation = Navigation {
                    id,
                    title: input.title,
                    description: input.description,
                    url: input.url,
                    icon: input.icon,
                    category_id: input.category_id,
                    tags: input.tags,
                    featured: input.featured,
                    is_active: true,
                    visit_count: 0,
                    rating: 0.0,
                    create_time: now.clone(),
                    update_time: now,
                };
                self.items.insert(0, navigation.clone());
                self.total += 1;
                NavigationEvent::Created(navigation)
            }
            NavigationCommand::Update { id, changes } => {
                let Some(item) = self.items.iter_mut().find(|n| n.id == id) else {
                    return NavigationEvent::NotFound(id);
                };
                if let Some(title) = changes.title {
                    item.title = title;
                }
                if let Some(description) = changes.description {
                    item.description = description;
                }
                if let Some(url) = changes.url {
                    item.url = url;
                }
                if let Some(icon) = changes.icon {
                    item.icon = Some(icon);
                }
                if let Some(category_id) = changes.category_id {
                    item.category_id = category_id;
                }
                if let Some(tags) = changes.tags {
                    item.tags = tags;
                }
                if let Some(featured) = changes.featured {
                    item.featured = featured;
                }
                if let Some(is_active) = changes.is_active {
                    item.is_active = is_active;
                }
                item.update_time = now_rfc3339();
                NavigationEvent::Updated(item.clone())
            }
            NavigationCommand::Delete(id) => {
                let before = self.items.len();
                self.items.retain(|n| n.id != id);
                if self.items.len() == before {
                    return NavigationEvent::NotFound(id);
                }
                self.total = self.total.saturating_sub(1);
                NavigationEvent::Deleted(id)
            }
            NavigationCommand::IncrementVisit(id) => {
                match self.items.iter_mut().find(|n| n.id == id) {
                    Some(item) => {
                        item.visit_count += 1;
                        NavigationEvent::VisitCounted {
                            id,
                            visit_count: item.visit_count,
                        }
                    }
                    None => NavigationEvent::NotFound(id),
                }
            }
            NavigationCommand::SetCategoryFilter(category) => {
                self.selected_category = category;
                self.page = 1;
                NavigationEvent::ViewChanged
            }
            NavigationCommand::SetPage(page) => {
                self.page = page.max(1);
                NavigationEvent::ViewChanged
            }
            NavigationCommand::SetPageSize(size) => {
                self.page_size = size.max(1);
                self.page = 1;
                NavigationEvent::ViewChanged
            }
            NavigationCommand::SetQuery { query, filters } => {
                self.query = query;
                self.filters = filters;
                self.page = 1;
                NavigationEvent::ViewChanged
            }
            NavigationCommand::ClearQuery => {
                self.query.clear();
                self.filters = ListFilters::default();
                self.page = 1;
                NavigationEvent::ViewChanged
            }
        }
    }

    pub fn items(&self) -> &[Navigation] {
        &self.items
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    /// Items matching the category, query and list filters
    pub fn filtered(&self) -> Vec<&Navigation> {
        let query = self.query.to_lowercase();
        self.items
            .iter()
            .filter(|n| {
                self.selected_category
                    .as_ref()
                    .is_none_or(|c| &n.category_id == c)
            })
            .filter(|n| {
                query.is_empty()
                    || n.title.to_lowercase().contains(&query)
                    || n.description.to_lowercase().contains(&query)
                    || n.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .filter(|n| !self.filters.featured || n.featured)
            .filter(|n| {
                self.filters.tags.is_empty() || self.filters.tags.iter().any(|t| n.tags.contains(t))
            })
            .filter(|n| self.filters.min_rating.is_none_or(|r| n.rating >= r))
            .collect()
    }

    /// The current page of [`Self::filtered`]
    pub fn current_page(&self) -> Vec<&Navigation> {
        let start = (self.page - 1) * self.page_size;
        self.filtered()
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size)
    }

    pub fn get(&self, id: &str) -> Option<&Navigation> {
        self.items.iter().find(|n| n.id == id)
    }

    /// First 10 featured items
    pub fn featured(&self) -> Vec<&Navigation> {
        self.items.iter().filter(|n| n.featured).take(10).collect()
    }

    /// Top 10 by visit count
    pub fn popular(&self) -> Vec<&Navigation> {
        let mut sorted: Vec<&Navigation> = self.items.iter().collect();
        sorted.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
        sorted.truncate(10);
        sorted
    }

    /// Sorted, de-duplicated tags across all items
    pub fn all_tags(&self) -> Vec<String> {
        let tags: std::collections::BTreeSet<&str> = self
            .items
            .iter()
            .flat_map(|n| n.tags.iter().map(String::as_str))
            .collect();
        tags.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(id: &str, category: &str, visits: u64) -> Navigation {
        Navigation {
            id: id.to_string(),
            title: format!("Tool {id}"),
            description: String::new(),
            url: "https://example.com".to_string(),
            icon: None,
            category_id: category.to_string(),
            tags: vec![],
            featured: false,
            is_active: true,
            visit_count: visits,
            rating: 0.0,
            create_time: String::new(),
            update_time: String::new(),
        }
    }

    fn loaded(items: Vec<Navigation>) -> NavigationStore {
        let mut store = NavigationStore::new();
        store.apply(NavigationCommand::Loaded(items));
        store
    }

    #[test]
    fn test_loaded_and_failed() {
        let mut store = loaded(vec![nav("nav_1", "cat_1", 0)]);
        assert!(store.load_state().is_loaded());
        assert_eq!(store.total(), 1);

        let event = store.apply(NavigationCommand::LoadFailed("bad json".into()));
        assert_eq!(event, NavigationEvent::LoadFailed("bad json".into()));
        assert_eq!(store.load_state().error(), Some("bad json"));
    }

    #[test]
    fn test_create_prepends_with_generated_id() {
        let mut store = loaded(vec![nav("nav_1", "cat_1", 0)]);
        let event = store.apply(NavigationCommand::Create(CreateNavigation {
            title: "New".into(),
            url: "https://new.example".into(),
            category_id: "cat_2".into(),
            ..Default::default()
        }));
        let NavigationEvent::Created(created) = event else {
            panic!("expected Created");
        };
        assert!(created.id.starts_with("nav_"));
        assert!(created.is_active);
        assert_eq!(created.create_time, created.update_time);
        assert_eq!(store.items()[0].id, created.id);
        assert_eq!(store.total(), 2);
    }

    #[test]
    fn test_update_merges_partial_fields() {
        let mut original = nav("nav_1", "cat_1", 7);
        original.rating = 4.5;
        original.update_time = "2024-01-01T00:00:00Z".into();
        let mut store = loaded(vec![original]);

        let event = store.apply(NavigationCommand::Update {
            id: "nav_1".into(),
            changes: UpdateNavigation {
                title: Some("Renamed".into()),
                featured: Some(true),
                ..Default::default()
            },
        });
        let NavigationEvent::Updated(updated) = event else {
            panic!("expected Updated");
        };
        assert_eq!(updated.title, "Renamed");
        assert!(updated.featured);
        assert_eq!(updated.visit_count, 7);
        assert_eq!(updated.rating, 4.5);
        assert_eq!(updated.url, "https://example.com");
        assert_ne!(updated.update_time, "2024-01-01T00:00:00Z");

        let missing = store.apply(NavigationCommand::Update {
            id: "nav_x".into(),
            changes: UpdateNavigation::default(),
        });
        assert_eq!(missing, NavigationEvent::NotFound("nav_x".into()));
    }

    #[test]
    fn test_delete_and_increment_visit() {
        let mut store = loaded(vec![nav("nav_1", "cat_1", 3), nav("nav_2", "cat_1", 0)]);
        assert_eq!(
            store.apply(NavigationCommand::IncrementVisit("nav_1".into())),
            NavigationEvent::VisitCounted {
                id: "nav_1".into(),
                visit_count: 4
            }
        );
        assert_eq!(
            store.apply(NavigationCommand::Delete("nav_2".into())),
            NavigationEvent::Deleted("nav_2".into())
        );
        assert_eq!(store.total(), 1);
        assert_eq!(
            store.apply(NavigationCommand::Delete("nav_2".into())),
            NavigationEvent::NotFound("nav_2".into())
        );
    }

    #[test]
    fn test_filtered_view_and_pagination() {
        let mut items: Vec<Navigation> = (0..45)
            .map(|i| nav(&format!("nav_{i}"), if i % 3 == 0 { "cat_a" } else { "cat_b" }, i))
            .collect();
        items[3].featured = true;
        items[3].tags = vec!["writing".into()];
        items[6].tags = vec!["writing".into()];
        items[6].rating = 4.0;
        let mut store = loaded(items);

        assert_eq!(store.total_pages(), 3);
        store.apply(NavigationCommand::SetPage(3));
        assert_eq!(store.current_page().len(), 5);

        store.apply(NavigationCommand::SetCategoryFilter(Some("cat_a".into())));
        assert_eq!(store.page(), 1);
        assert_eq!(store.filtered().len(), 15);

        store.apply(NavigationCommand::SetQuery {
            query: "WRITING".into(),
            filters: ListFilters::default(),
        });
        assert_eq!(store.filtered().len(), 2);

        store.apply(NavigationCommand::SetQuery {
            query: String::new(),
            filters: ListFilters {
                min_rating: Some(3.0),
                ..Default::default()
            },
        });
        let ids: Vec<&str> = store.filtered().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["nav_6"]);

        store.apply(NavigationCommand::ClearQuery);
        store.apply(NavigationCommand::SetCategoryFilter(None));
        store.apply(NavigationCommand::SetPageSize(50));
        assert_eq!(store.total_pages(), 1);
        assert_eq!(store.current_page().len(), 45);
    }

    #[test]
    fn test_featured_popular_and_tags() {
        let mut items: Vec<Navigation> = (0..15).map(|i| nav(&format!("nav_{i}"), "c", i)).collect();
        for item in items.iter_mut() {
            item.featured = true;
        }
        items[0].tags = vec!["b".into(), "a".into()];
        items[1].tags = vec!["a".into()];
        let store = loaded(items);

        assert_eq!(store.featured().len(), 10);
        let popular = store.popular();
        assert_eq!(popular.len(), 10);
        assert_eq!(popular[0].id, "nav_14");
        assert_eq!(store.all_tags(), vec!["a", "b"]);
        assert_eq!(store.get("nav_3").unwrap().visit_count, 3);
    }
}
