use serde::Serialize;
use std::collections::HashSet;

use super::{generate_id, LoadState};
use crate::types::{now_rfc3339, Category, CreateCategory, Navigation, UpdateCategory};

const DEFAULT_COLOR: &str = "#1890ff";

#[derive(Debug, Clone)]
pub enum CategoryCommand {
    Loaded(Vec<Category>),
    LoadFailed(String),
    Create(CreateCategory),
    Update { id: String, changes: UpdateCategory },
    Delete(String),
    Select(Option<String>),
    /// New `order` values by category id
    Reorder(Vec<(String, i64)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryEvent {
    Loaded { count: usize },
    LoadFailed(String),
    Created(Category),
    Updated(Category),
    Deleted(String),
    Selected(Option<String>),
    Reordered { updated: usize },
    NotFound(String),
}

/// A category placed in the display tree
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTreeNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryTreeNode>,
    pub selected: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub navigation_count: usize,
    pub child_count: usize,
    pub level: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryStore {
    categories: Vec<Category>,
    load_state: LoadState,
    selected: Option<String>,
}

fn find_mut<'a>(categories: &'a mut [Category], id: &str) -> Option<&'a mut Category> {
    for category in categories.iter_mut() {
        if category.id == id {
            return Some(category);
        }
        if let Some(found) = find_mut(&mut category.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove(categories: &mut Vec<Category>, id: &str) -> bool {
    let before = categories.len();
    categories.retain(|c| c.id != id);
    let mut removed = categories.len() != before;
    for category in categories.iter_mut() {
        removed |= remove(&mut category.children, id);
    }
    removed
}

fn flatten_into<'a>(categories: &'a [Category], out: &mut Vec<&'a Category>) {
    for category in categories {
        out.push(category);
        flatten_into(&category.children, out);
    }
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: CategoryCommand) -> CategoryEvent {
        match command {
            CategoryCommand::Loaded(categories) => {
                self.categories = categories;
                self.load_state = LoadState::Loaded;
                CategoryEvent::Loaded {
                    count: self.flattened().len(),
                }
            }
            CategoryCommand::LoadFailed(message) => {
                tracing::warn!("Failed to load categories: {}", message);
                self.load_state = LoadState::Failed(message.clone());
                CategoryEvent::LoadFailed(message)
            }
            CategoryCommand::Create(input) => {
                let level = match &input.parent_id {
                    Some(parent) => match self.get(parent) {
                        Some(p) => p.level + 1,
                        None => return CategoryEvent::NotFound(parent.clone()),
                    },
                    None => 0,
                };
                let id = generate_id("cat", |id| self.get(id).is_some());
                let now = now_rfc3339();
                let category = Category {
                    id,
                    name: input.name,
                    description: input.description,
                    icon: input.icon,
                    color: Some(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
                    order: input.order.unwrap_or(1),
                    parent_id: input.parent_id,
                    level,
                    is_active: true,
                    create_time: now.clone(),
                    update_time: now,
                    children: Vec::new(),
                };
                self.categories.push(category.clone());
                CategoryEvent::Created(category)
            }
            CategoryCommand::Update { id, changes } => {
                let parent_level = match &changes.parent_id {
                    Some(Some(parent)) => match self.get(parent) {
                        Some(p) => Some(p.level + 1),
                        None => return CategoryEvent::NotFound(parent.clone()),
                    },
                    Some(None) => Some(0),
                    None => None,
                };
                let Some(category) = find_mut(&mut self.categories, &id) else {
                    return CategoryEvent::NotFound(id);
                };
                if let Some(name) = changes.name {
                    category.name = name;
                }
                if let Some(description) = changes.description {
                    category.description = Some(description);
                }
                if let Some(icon) = changes.icon {
                    category.icon = Some(icon);
                }
                if let Some(color) = changes.color {
                    category.color = Some(color);
                }
                if let Some(parent_id) = changes.parent_id {
                    category.parent_id = parent_id;
                }
                if let Some(level) = parent_level {
                    category.level = level;
                }
                if let Some(order) = changes.order {
                    category.order = order;
                }
                if let Some(is_active) = changes.is_active {
                    category.is_active = is_active;
                }
                category.update_time = now_rfc3339();
                CategoryEvent::Updated(category.clone())
            }
            CategoryCommand::Delete(id) => {
                if !remove(&mut self.categories, &id) {
                    return CategoryEvent::NotFound(id);
                }
                if self.selected.as_deref() == Some(id.as_str()) {
                    self.selected = None;
                }
                CategoryEvent::Deleted(id)
            }
            CategoryCommand::Select(id) => {
                self.selected = id.clone();
                CategoryEvent::Selected(id)
            }
            CategoryCommand::Reorder(orders) => {
                let mut updated = 0;
                for (id, order) in orders {
                    if let Some(category) = find_mut(&mut self.categories, &id) {
                        category.order = order;
                        updated += 1;
                    }
                }
                CategoryEvent::Reordered { updated }
            }
        }
    }

    /// Top-level list as loaded (children may be nested inline)
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Every category, nested children included, depth first
    pub fn flattened(&self) -> Vec<&Category> {
        let mut out = Vec::new();
        flatten_into(&self.categories, &mut out);
        out
    }

    /// Flattened copies with inline children stripped, for search and validation
    pub fn flat_list(&self) -> Vec<Category> {
        self.flattened()
            .into_iter()
            .map(|c| Category {
                children: Vec::new(),
                ..c.clone()
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.flattened().into_iter().find(|c| c.id == id)
    }

    pub fn roots(&self) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| c.parent_id.is_none())
            .collect()
    }

    pub fn children_of(&self, parent_id: &str) -> Vec<&Category> {
        self.flattened()
            .into_iter()
            .filter(|c| c.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Root-to-leaf chain ending at `id`; stops at a repeated id
    pub fn path(&self, id: &str) -> Vec<&Category> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id);
        while let Some(category) = current {
            if !seen.insert(category.id.as_str()) {
                break;
            }
            path.push(category);
            current = category.parent_id.as_deref().and_then(|p| self.get(p));
        }
        path.reverse();
        path
    }

    /// Display tree built from parent links, siblings sorted by `order`
    pub fn tree(&self) -> Vec<CategoryTreeNode> {
        let flat = self.flat_list();
        let mut visited = HashSet::new();
        self.build_level(&flat, None, &mut visited)
    }

    fn build_level(
        &self,
        flat: &[Category],
        parent: Option<&str>,
        visited: &mut HashSet<String>,
    ) -> Vec<CategoryTreeNode> {
        let mut level: Vec<&Category> = flat
            .iter()
            .filter(|c| c.parent_id.as_deref() == parent)
            .collect();
        level.sort_by_key(|c| c.order);

        let mut nodes = Vec::new();
        for category in level {
            if !visited.insert(category.id.clone()) {
                continue;
            }
            nodes.push(CategoryTreeNode {
                children: self.build_level(flat, Some(category.id.as_str()), visited),
                selected: self.selected.as_deref() == Some(category.id.as_str()),
                disabled: !category.is_active,
                category: category.clone(),
            });
        }
        nodes
    }

    pub fn stats(&self, id: &str, navigations: &[Navigation]) -> Option<CategoryStats> {
        let category = self.get(id)?;
        Some(CategoryStats {
            navigation_count: navigations.iter().filter(|n| n.category_id == id).count(),
            child_count: self.children_of(id).len(),
            level: category.level,
        })
    }
}
