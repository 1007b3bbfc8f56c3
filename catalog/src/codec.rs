//! Message codec lookup.
//!
//! Codecs are registered under a [`CodecKey`] at startup, either as factory
//! closures for hand-written codecs or from JSON schema definitions. The
//! registry hands out a fresh codec instance per lookup.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::hash::definitions_hash;
use crate::protocol::{FIREFALL_REF_ID, GENERIC_ALIAS_ID};
use crate::schema::{DecodedField, MessageSchema, SchemaCodec};
use crate::sift::read_json;

/// Controller id used by registrations that apply to any controller.
pub const ANY_CONTROLLER: i32 = -1;

/// Unpacks and packs the body of one message type.
pub trait MessageCodec: Send + fmt::Debug {
    /// Display name of the message type.
    fn name(&self) -> &str;

    /// Reads the message body; returns the number of bytes consumed.
    fn unpack(&mut self, bytes: &[u8]) -> CatalogResult<usize>;

    /// Writes the held values into `buf`; returns the number of bytes written.
    fn pack(&self, buf: &mut [u8]) -> CatalogResult<usize>;

    /// Bytes [`pack`](Self::pack) would write.
    fn packed_size(&self) -> usize;

    /// Field values with their byte spans, if the codec exposes them.
    fn fields(&self) -> Vec<DecodedField> {
        Vec::new()
    }
}

/// Protocol family of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MsgType {
    Control,
    Matrix,
    Gss,
}

/// Direction of a message: server messages or client commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MsgSrc {
    Message,
    Command,
}

impl MsgSrc {
    #[must_use]
    pub const fn from_server(from_server: bool) -> Self {
        if from_server {
            Self::Message
        } else {
            Self::Command
        }
    }
}

/// Registry key of a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecKey {
    pub msg_type: MsgType,
    pub msg_src: MsgSrc,
    pub message_id: u8,
    pub controller_id: i32,
}

impl CodecKey {
    #[must_use]
    pub const fn new(msg_type: MsgType, msg_src: MsgSrc, message_id: u8, controller_id: i32) -> Self {
        Self {
            msg_type,
            msg_src,
            message_id,
            controller_id,
        }
    }

    /// Folds the generic alias controller into the generic controller.
    #[must_use]
    pub const fn normalized(self) -> Self {
        let controller_id = if self.controller_id == GENERIC_ALIAS_ID {
            FIREFALL_REF_ID
        } else {
            self.controller_id
        };
        Self {
            controller_id,
            ..self
        }
    }

    #[must_use]
    pub const fn any_controller(self) -> Self {
        Self {
            controller_id: ANY_CONTROLLER,
            ..self
        }
    }
}

impl fmt::Display for CodecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/{}@{}",
            self.msg_type, self.msg_src, self.message_id, self.controller_id
        )
    }
}

/// One schema-driven codec registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecDefinition {
    pub msg_type: MsgType,
    pub msg_src: MsgSrc,
    pub message_id: u8,
    #[serde(default = "any_controller")]
    pub controller_id: i32,
    pub schema: MessageSchema,
}

impl CodecDefinition {
    #[must_use]
    pub const fn key(&self) -> CodecKey {
        CodecKey::new(self.msg_type, self.msg_src, self.message_id, self.controller_id)
    }
}

const fn any_controller() -> i32 {
    ANY_CONTROLLER
}

/// A set of codec definitions, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecDefinitions {
    #[serde(default)]
    pub codecs: Vec<CodecDefinition>,
}

impl CodecDefinitions {
    /// Reads definitions from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let defs: Self = read_json(path.as_ref())?;
        for def in &defs.codecs {
            def.schema.validate()?;
        }
        Ok(defs)
    }
}

type CodecFactory = Arc<dyn Fn() -> Box<dyn MessageCodec> + Send + Sync>;

/// Lookup table from [`CodecKey`] to codec factory.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    factories: HashMap<CodecKey, CodecFactory>,
    definitions_hash: Option<u64>,
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from schema definitions.
    pub fn from_definitions(defs: &CodecDefinitions) -> CatalogResult<Self> {
        let mut registry = Self::new();
        for def in &defs.codecs {
            registry.register_schema(def.key(), def.schema.clone())?;
        }
        registry.definitions_hash = Some(definitions_hash(defs));
        info!(
            target: "peep::catalog",
            codecs = registry.len(),
            "built codec registry from definitions"
        );
        Ok(registry)
    }

    /// Registers a factory for a hand-written codec.
    pub fn register<F>(&mut self, key: CodecKey, factory: F) -> CatalogResult<()>
    where
        F: Fn() -> Box<dyn MessageCodec> + Send + Sync + 'static,
    {
        let key = key.normalized();
        if self.factories.contains_key(&key) {
            return Err(CatalogError::DuplicateCodec {
                key: key.to_string(),
            });
        }
        self.factories.insert(key, Arc::new(factory));
        self.definitions_hash = None;
        Ok(())
    }

    /// Registers a schema-driven codec.
    pub fn register_schema(&mut self, key: CodecKey, schema: MessageSchema) -> CatalogResult<()> {
        schema.validate()?;
        let schema = Arc::new(schema);
        self.register(key, move || Box::new(SchemaCodec::new(Arc::clone(&schema))))
    }

    /// Returns a fresh codec for the message, or `None` if no type matches.
    ///
    /// An exact controller match wins; otherwise a registration made for
    /// [`ANY_CONTROLLER`] is used.
    #[must_use]
    pub fn resolve(
        &self,
        msg_type: MsgType,
        msg_src: MsgSrc,
        message_id: u8,
        controller_id: i32,
    ) -> Option<Box<dyn MessageCodec>> {
        self.resolve_key(CodecKey::new(msg_type, msg_src, message_id, controller_id))
    }

    /// Same as [`resolve`](Self::resolve), keyed by a [`CodecKey`].
    #[must_use]
    pub fn resolve_key(&self, key: CodecKey) -> Option<Box<dyn MessageCodec>> {
        let key = key.normalized();
        let factory = self
            .factories
            .get(&key)
            .or_else(|| self.factories.get(&key.any_controller()));
        if factory.is_none() {
            debug!(target: "peep::catalog", %key, "no codec registered");
        }
        factory.map(|make| make())
    }

    #[must_use]
    pub fn contains(&self, key: CodecKey) -> bool {
        let key = key.normalized();
        self.factories.contains_key(&key) || self.factories.contains_key(&key.any_controller())
    }

    /// Registered keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<CodecKey> {
        let mut keys: Vec<_> = self.factories.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Hash of the definitions this registry was built from.
    ///
    /// `None` once hand-written codecs have been registered.
    #[must_use]
    pub const fn definitions_hash(&self) -> Option<u64> {
        self.definitions_hash
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("keys", &self.keys())
            .field("definitions_hash", &self.definitions_hash)
            .finish()
    }
}
