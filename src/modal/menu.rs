//! Host-agnostic menu tree and its flattened, addressable view.

use crate::keys::KeyStroke;

/// Stable reference to one menu item, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MenuItemId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub title: String,
    pub shortcut: Option<KeyStroke>,
    /// Action reference the host fires when the item is invoked.
    pub action: String,
}

impl MenuItem {
    pub fn new(id: u64, title: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: MenuItemId(id),
            title: title.into(),
            shortcut: None,
            action: action.into(),
        }
    }

    pub fn with_shortcut(mut self, shortcut: KeyStroke) -> Self {
        self.shortcut = Some(shortcut);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuNode {
    Leaf(MenuItem),
    SubMenu {
        title: String,
        children: Vec<MenuNode>,
    },
}

impl MenuNode {
    pub fn submenu(title: impl Into<String>, children: Vec<MenuNode>) -> Self {
        MenuNode::SubMenu {
            title: title.into(),
            children,
        }
    }
}

impl From<MenuItem> for MenuNode {
    fn from(item: MenuItem) -> Self {
        MenuNode::Leaf(item)
    }
}

/// Fully-qualified title path plus the item it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemDescriptor {
    pub path: Vec<String>,
    pub id: MenuItemId,
}

impl MenuItemDescriptor {
    pub fn qualified_title(&self) -> String {
        self.path.join(" > ")
    }
}

/// Depth-first list of every leaf with its title path.
pub fn flatten(nodes: &[MenuNode]) -> Vec<MenuItemDescriptor> {
    fn walk(nodes: &[MenuNode], prefix: &mut Vec<String>, out: &mut Vec<MenuItemDescriptor>) {
        for node in nodes {
            match node {
                MenuNode::Leaf(item) => {
                    let mut path = prefix.clone();
                    path.push(item.title.clone());
                    out.push(MenuItemDescriptor { path, id: item.id });
                }
                MenuNode::SubMenu { title, children } => {
                    prefix.push(title.clone());
                    walk(children, prefix, out);
                    prefix.pop();
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut Vec::new(), &mut out);
    out
}

/// Visit every leaf, depth-first.
pub fn for_each_item_mut(nodes: &mut [MenuNode], visit: &mut dyn FnMut(&mut MenuItem)) {
    for node in nodes {
        match node {
            MenuNode::Leaf(item) => visit(item),
            MenuNode::SubMenu { children, .. } => for_each_item_mut(children, visit),
        }
    }
}

pub fn find_item(nodes: &[MenuNode], id: MenuItemId) -> Option<&MenuItem> {
    nodes.iter().find_map(|node| match node {
        MenuNode::Leaf(item) if item.id == id => Some(item),
        MenuNode::Leaf(_) => None,
        MenuNode::SubMenu { children, .. } => find_item(children, id),
    })
}

pub fn find_item_mut(nodes: &mut [MenuNode], id: MenuItemId) -> Option<&mut MenuItem> {
    nodes.iter_mut().find_map(|node| match node {
        MenuNode::Leaf(item) if item.id == id => Some(item),
        MenuNode::Leaf(_) => None,
        MenuNode::SubMenu { children, .. } => find_item_mut(children, id),
    })
}

/// Split `"Navigation > Next File Tab"` or `"Edit/Copy"` into titles.
///
/// `/` is only a separator when the path has no `" > "`. A title that itself
/// contains `/` (`"Open/Save Panel"`) must be addressed with `" > "`, which is
/// also what [`MenuItemDescriptor::qualified_title`] produces.
pub fn parse_title_path(path: &str) -> Vec<String> {
    let separator = if path.contains(" > ") { " > " } else { "/" };
    path.split(separator)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve a fully-qualified title path against the live tree.
pub fn resolve_path<'a>(nodes: &'a [MenuNode], path: &str) -> Option<&'a MenuItem> {
    let titles = parse_title_path(path);
    let (last, parents) = titles.split_last()?;
    let mut level = nodes;
    for title in parents {
        level = level.iter().find_map(|node| match node {
            MenuNode::SubMenu {
                title: candidate,
                children,
            } if candidate == title => Some(children.as_slice()),
            _ => None,
        })?;
    }
    level.iter().find_map(|node| match node {
        MenuNode::Leaf(item) if &item.title == last => Some(item),
        _ => None,
    })
}
