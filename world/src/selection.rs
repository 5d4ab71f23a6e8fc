//! Tier/theme board selection registry.
//!
//! Selection is two-phase: a name is first *reserved* for a tier/theme slot
//! (the pick made in a board-selection UI), and later *registered* once the
//! board is actually materialised into the world. Both phases share one rule:
//! a tier/theme slot holds at most one name, and a name is reserved at most
//! once globally. First come, first served; no priority ordering.

use std::collections::{BTreeMap, BTreeSet};

use skillweave_core::{SelectionError, Theme, Tier};

#[derive(Debug, Default)]
pub(crate) struct SelectionRegistry {
    slots: BTreeMap<(Tier, Theme), String>,
    names: BTreeSet<String>,
    placed: BTreeSet<String>,
}

impl SelectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Checks the selection rule without mutating the registry.
    pub(crate) fn can_select(
        &self,
        name: &str,
        tier: Tier,
        theme: Theme,
    ) -> Result<(), SelectionError> {
        if self.slots.contains_key(&(tier, theme)) {
            return Err(SelectionError::ThemeTaken);
        }
        if self.names.contains(name) {
            return Err(SelectionError::NameTaken);
        }
        Ok(())
    }

    /// Reserves a name for a tier/theme slot.
    pub(crate) fn select(
        &mut self,
        name: &str,
        tier: Tier,
        theme: Theme,
    ) -> Result<(), SelectionError> {
        self.can_select(name, tier, theme)?;
        let _ = self.slots.insert((tier, theme), name.to_owned());
        let _ = self.names.insert(name.to_owned());
        Ok(())
    }

    /// Releases a reservation, returning the slot it occupied.
    pub(crate) fn deselect(&mut self, name: &str) -> Result<(Tier, Theme), SelectionError> {
        if !self.names.remove(name) {
            return Err(SelectionError::NotSelected);
        }
        let slot = self
            .slots
            .iter()
            .find(|(_, owner)| owner.as_str() == name)
            .map(|(slot, _)| *slot);
        match slot {
            Some(slot) => {
                let _ = self.slots.remove(&slot);
                Ok(slot)
            }
            // The name set and slot map only diverge through a bug; restore
            // the name to keep the registry self-consistent and report the
            // reservation as missing.
            None => {
                let _ = self.names.insert(name.to_owned());
                Err(SelectionError::NotSelected)
            }
        }
    }

    /// Name currently reserved for the slot, if any.
    pub(crate) fn selected_for(&self, tier: Tier, theme: Theme) -> Option<&str> {
        self.slots.get(&(tier, theme)).map(String::as_str)
    }

    pub(crate) fn is_selected(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Marks a reserved name as materialised in the world.
    pub(crate) fn register_placed(&mut self, name: &str) {
        let _ = self.placed.insert(name.to_owned());
    }

    /// Clears the materialised mark when a board leaves the world.
    pub(crate) fn unregister_placed(&mut self, name: &str) {
        let _ = self.placed.remove(name);
    }

    pub(crate) fn is_placed(&self, name: &str) -> bool {
        self.placed.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_hold_one_name_first_come_first_served() {
        let mut registry = SelectionRegistry::new();
        registry
            .select("ember-field", Tier::new(1), Theme::Fire)
            .expect("slot is free");

        assert_eq!(
            registry.select("cinder-wastes", Tier::new(1), Theme::Fire),
            Err(SelectionError::ThemeTaken)
        );
        assert_eq!(
            registry.selected_for(Tier::new(1), Theme::Fire),
            Some("ember-field")
        );
    }

    #[test]
    fn names_are_globally_unique() {
        let mut registry = SelectionRegistry::new();
        registry
            .select("ember-field", Tier::new(1), Theme::Fire)
            .expect("slot is free");

        assert_eq!(
            registry.select("ember-field", Tier::new(2), Theme::Fire),
            Err(SelectionError::NameTaken)
        );
    }

    #[test]
    fn deselect_frees_the_slot_for_reuse() {
        let mut registry = SelectionRegistry::new();
        registry
            .select("ember-field", Tier::new(1), Theme::Fire)
            .expect("slot is free");

        let slot = registry.deselect("ember-field").expect("name was reserved");
        assert_eq!(slot, (Tier::new(1), Theme::Fire));

        registry
            .select("cinder-wastes", Tier::new(1), Theme::Fire)
            .expect("slot was freed");
    }

    #[test]
    fn deselecting_unknown_name_is_rejected() {
        let mut registry = SelectionRegistry::new();
        assert_eq!(
            registry.deselect("ember-field"),
            Err(SelectionError::NotSelected)
        );
    }

    #[test]
    fn placement_marks_are_tracked_separately() {
        let mut registry = SelectionRegistry::new();
        registry
            .select("ember-field", Tier::new(1), Theme::Fire)
            .expect("slot is free");
        assert!(!registry.is_placed("ember-field"));

        registry.register_placed("ember-field");
        assert!(registry.is_placed("ember-field"));
        assert!(registry.is_selected("ember-field"));

        registry.unregister_placed("ember-field");
        assert!(!registry.is_placed("ember-field"));
        assert!(registry.is_selected("ember-field"));
    }
}
