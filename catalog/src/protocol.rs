//! Controller namespaces and name lookups.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::CatalogResult;
use crate::sift::{GssProtocol, Namespace, SiftData};

// Namespace ids come from the header resolver.
pub use wire::{
    CONTROL_REF_ID, GENERIC_VIEW_ALIAS as GENERIC_ALIAS_ID, GENERIC_VIEW_ID as FIREFALL_REF_ID,
    MATRIX_REF_ID,
};

const CONTROL_MESSAGES: [(u8, &str); 6] = [
    (0, "Close"),
    (2, "MatrixAck"),
    (3, "GSSAck"),
    (4, "TimeSyncRequest"),
    (5, "TimeSyncResponse"),
    (6, "MTUProbe"),
];

const ROUTED_MESSAGES: [(u8, &str); 2] = [
    (8, "RoutedMultipleMessage 1"),
    (9, "RoutedMultipleMessage 2"),
];

const VIEW_MESSAGES: [(u8, &str); 6] = [
    (1, "Update"),
    (2, "Checksum"),
    (3, "Keyframe View"),
    (4, "Keyframe Controller"),
    (5, "Remove Controller"),
    (6, "Remove View"),
];

/// A resolved controller namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerData {
    pub id: i32,
    pub name: String,
    pub messages: BTreeMap<u8, String>,
    pub commands: BTreeMap<u8, String>,
}

impl ControllerData {
    #[must_use]
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    fn with_messages(mut self, names: &BTreeMap<String, u8>) -> Self {
        self.messages
            .extend(names.iter().map(|(name, &id)| (id, name.clone())));
        self
    }

    fn with_commands(mut self, names: &BTreeMap<String, u8>) -> Self {
        self.commands
            .extend(names.iter().map(|(name, &id)| (id, name.clone())));
        self
    }
}

/// Name lookups against a protocol catalog.
///
/// Lookups never fail: unknown ids fall back to the stringified number.
pub trait MessageNames {
    fn message_name(&self, controller_id: i32, message_id: u8) -> String;
    fn command_name(&self, controller_id: i32, command_id: u8) -> String;
    fn controller_name(&self, controller_id: i32) -> String;
}

/// Controller namespaces for one selected build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolCatalog {
    build: String,
    matrix_protocol_version: u16,
    gss_protocol_version: u16,
    has_routed_multiple_message: bool,
    controllers: BTreeMap<i32, ControllerData>,
}

impl ProtocolCatalog {
    /// Builds the catalog for `build` (`"<environment> <version>"`).
    pub fn from_sift(data: &SiftData, build: &str) -> CatalogResult<Self> {
        let (patch, matrix, gss) = data.protocols_for(build)?;
        let mut catalog = Self::from_protocols(matrix, gss);
        catalog.build = build.to_string();
        catalog.matrix_protocol_version = patch.matrix_protocol_version;
        catalog.gss_protocol_version = patch.gss_protocol_version;
        Ok(catalog)
    }

    /// Builds the controller table from loaded protocol namespaces.
    #[must_use]
    pub fn from_protocols(matrix: &Namespace, gss: &GssProtocol) -> Self {
        let mut controllers = BTreeMap::new();

        let mut control = ControllerData::new(CONTROL_REF_ID, "Control");
        control.messages.extend(
            CONTROL_MESSAGES
                .iter()
                .map(|&(id, name)| (id, name.to_string())),
        );
        controllers.insert(CONTROL_REF_ID, control);

        controllers.insert(
            MATRIX_REF_ID,
            ControllerData::new(MATRIX_REF_ID, "Matrix").with_messages(&matrix.messages),
        );

        let mut firefall =
            ControllerData::new(FIREFALL_REF_ID, "Firefall").with_messages(&gss.namespace.messages);
        firefall.messages.extend(
            ROUTED_MESSAGES
                .iter()
                .map(|&(id, name)| (id, name.to_string())),
        );
        controllers.insert(FIREFALL_REF_ID, firefall);

        for (ns_name, ns) in &gss.namespace.children {
            for (view_name, &view_id) in &ns.views {
                let id = i32::from(view_id);
                let mut view = ControllerData::new(id, format!("{ns_name}::{view_name}"))
                    .with_messages(&ns.messages)
                    .with_commands(&ns.commands);
                view.messages.extend(
                    VIEW_MESSAGES
                        .iter()
                        .map(|&(id, name)| (id, name.to_string())),
                );
                if controllers.insert(id, view).is_some() {
                    debug!(target: "peep::catalog", id, "view id defined twice, keeping last");
                }
            }
        }

        Self {
            has_routed_multiple_message: gss.has_routed_multiple_message,
            controllers,
            ..Self::default()
        }
    }

    /// Selected build name, empty if built directly from protocols.
    #[must_use]
    pub fn build(&self) -> &str {
        &self.build
    }

    #[must_use]
    pub const fn matrix_protocol_version(&self) -> u16 {
        self.matrix_protocol_version
    }

    #[must_use]
    pub const fn gss_protocol_version(&self) -> u16 {
        self.gss_protocol_version
    }

    #[must_use]
    pub const fn has_routed_multiple_message(&self) -> bool {
        self.has_routed_multiple_message
    }

    /// Returns the controller for `id`; `251` resolves to the generic controller.
    #[must_use]
    pub fn controller(&self, id: i32) -> Option<&ControllerData> {
        let id = if id == GENERIC_ALIAS_ID {
            FIREFALL_REF_ID
        } else {
            id
        };
        self.controllers.get(&id)
    }

    /// Iterates controllers in ascending id order.
    pub fn controllers(&self) -> impl Iterator<Item = &ControllerData> {
        self.controllers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl MessageNames for ProtocolCatalog {
    fn message_name(&self, controller_id: i32, message_id: u8) -> String {
        self.controller(controller_id)
            .and_then(|c| c.messages.get(&message_id))
            .cloned()
            .unwrap_or_else(|| message_id.to_string())
    }

    fn command_name(&self, controller_id: i32, command_id: u8) -> String {
        self.controller(controller_id)
            .and_then(|c| c.commands.get(&command_id))
            .cloned()
            .unwrap_or_else(|| command_id.to_string())
    }

    fn controller_name(&self, controller_id: i32) -> String {
        self.controller(controller_id)
            .map_or_else(|| controller_id.to_string(), |c| c.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProtocolCatalog {
        let matrix: Namespace = serde_json::from_str(r#"{ "Messages": { "Login": 3 } }"#).unwrap();
        let gss: GssProtocol = serde_json::from_str(
            r#"{
                "HasRoutedMultipleMessage": true,
                "Messages": { "Tick": 12 },
                "Children": {
                    "Character": {
                        "Views": { "BaseController": 2, "CombatController": 4 },
                        "Messages": { "Fired": 40 },
                        "Commands": { "Jump": 7 }
                    }
                }
            }"#,
        )
        .unwrap();
        ProtocolCatalog::from_protocols(&matrix, &gss)
    }

    #[test]
    fn fixed_namespaces() {
        let catalog = sample();
        assert_eq!(catalog.controller_name(CONTROL_REF_ID), "Control");
        assert_eq!(catalog.message_name(CONTROL_REF_ID, 4), "TimeSyncRequest");
        assert_eq!(catalog.message_name(MATRIX_REF_ID, 3), "Login");
        assert_eq!(catalog.message_name(FIREFALL_REF_ID, 8), "RoutedMultipleMessage 1");
        assert_eq!(catalog.message_name(FIREFALL_REF_ID, 12), "Tick");
        assert!(catalog.has_routed_multiple_message());
    }

    #[test]
    fn views_get_namespaced_names_and_inbuilt_messages() {
        let catalog = sample();
        assert_eq!(catalog.controller_name(2), "Character::BaseController");
        assert_eq!(catalog.controller_name(4), "Character::CombatController");
        assert_eq!(catalog.message_name(4, 3), "Keyframe View");
        assert_eq!(catalog.message_name(4, 40), "Fired");
        assert_eq!(catalog.command_name(2, 7), "Jump");
    }

    #[test]
    fn generic_alias() {
        let catalog = sample();
        assert_eq!(catalog.controller_name(251), "Firefall");
        assert_eq!(catalog.message_name(251, 12), "Tick");
    }

    #[test]
    fn unknown_ids_fall_back_to_numbers() {
        let catalog = sample();
        assert_eq!(catalog.controller_name(99), "99");
        assert_eq!(catalog.message_name(99, 5), "5");
        assert_eq!(catalog.command_name(2, 200), "200");
        assert_eq!(catalog.message_name(CONTROL_REF_ID, 1), "1");
    }

    #[test]
    fn controllers_are_ordered() {
        let ids: Vec<i32> = sample().controllers().map(|c| c.id).collect();
        assert_eq!(ids, vec![-2, -1, 0, 2, 4]);
    }
}
