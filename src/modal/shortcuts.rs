use super::menu::{find_item_mut, for_each_item_mut, MenuItem, MenuItemId, MenuNode};
use crate::keys::KeyStroke;
use crate::log_debug;
use std::collections::BTreeMap;

/// Menu key-equivalent reserved by command mode.
pub type ShortcutDescriptor = KeyStroke;

/// Shortcuts currently removed from the menu tree, keyed by the item they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutSuppressionSet {
    originals: BTreeMap<MenuItemId, ShortcutDescriptor>,
}

impl ShortcutSuppressionSet {
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn contains(&self, id: MenuItemId) -> bool {
        self.originals.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MenuItemId, &ShortcutDescriptor)> {
        self.originals.iter().map(|(id, shortcut)| (*id, shortcut))
    }
}

/// Removes and restores the menu shortcuts that clash with command-mode keys.
#[derive(Debug, Clone)]
pub struct ShortcutFilter {
    reserved: Vec<ShortcutDescriptor>,
    suppressed: ShortcutSuppressionSet,
}

impl ShortcutFilter {
    pub fn new(reserved: Vec<ShortcutDescriptor>) -> Self {
        Self {
            reserved,
            suppressed: ShortcutSuppressionSet::default(),
        }
    }

    pub fn reserved(&self) -> &[ShortcutDescriptor] {
        &self.reserved
    }

    pub fn suppressed(&self) -> &ShortcutSuppressionSet {
        &self.suppressed
    }

    /// Clear every reserved key-equivalent in the tree and remember the original.
    ///
    /// Repeating the call only touches items that regained a reserved shortcut
    /// since the last pass; an item already in the set keeps its first recorded
    /// original. Returns how many items were cleared on this pass.
    pub fn suppress(&mut self, menu: &mut [MenuNode]) -> usize {
        let reserved = &self.reserved;
        let originals = &mut self.suppressed.originals;
        let mut cleared = 0;
        for_each_item_mut(menu, &mut |item: &mut MenuItem| {
            let matches = item
                .shortcut
                .as_ref()
                .is_some_and(|shortcut| reserved.contains(shortcut));
            if !matches {
                return;
            }
            if let Some(shortcut) = item.shortcut.take() {
                originals.entry(item.id).or_insert(shortcut);
                cleared += 1;
            }
        });
        if cleared > 0 {
            log_debug(&format!("suppressed {cleared} menu shortcut(s)"));
        }
        cleared
    }

    /// Put back every recorded shortcut and empty the set.
    ///
    /// Items that disappeared from the tree are skipped. Returns how many were restored.
    pub fn restore(&mut self, menu: &mut [MenuNode]) -> usize {
        let mut restored = 0;
        for (id, shortcut) in std::mem::take(&mut self.suppressed.originals) {
            match find_item_mut(menu, id) {
                Some(item) => {
                    item.shortcut = Some(shortcut);
                    restored += 1;
                }
                None => log_debug(&format!("menu item {} gone; shortcut not restored", id.0)),
            }
        }
        restored
    }
}
