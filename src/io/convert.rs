//! Conversion between [`Booster`] and the storage payload, plus the
//! save/load API.
//!
//! ```no_run
//! # use treeboost::model::{Booster, Config};
//! # fn main() -> treeboost::Result<()> {
//! let booster = Booster::new(Config::new())?;
//! booster.save("model.tbst")?;
//! let restored = Booster::load("model.tbst")?;
//! assert_eq!(restored, booster);
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{FormatError, Result};
use crate::io::native::{FormatFlags, FormatHeader, read_framed, write_framed};
use crate::io::payload::{ForestPayload, ModelMetadata, Payload, PayloadV1, TreePayload};
use crate::model::{AttributeStore, Booster, Config};
use crate::repr::{Forest, Tree};

// ============================================================================
// Booster Serialization API
// ============================================================================

impl Booster {
    /// Save the model to a file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// [`BoostError::Io`](crate::BoostError::Io) when the file cannot be
    /// created or written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_to_writer(&mut writer)?;
        debug!(path = %path.display(), version = self.version(), "model saved");
        Ok(())
    }

    /// Write the model to any byte sink.
    pub fn save_to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload = Payload::from_booster(self);
        let bytes = postcard::to_allocvec(&payload).map_err(FormatError::from)?;
        let mut header = self.format_header();
        write_framed(writer, &mut header, &bytes)
    }

    /// Serialize the model to an owned buffer.
    ///
    /// Equal models produce identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.save_to_writer(&mut out)?;
        Ok(out)
    }

    /// Load a model from a file.
    ///
    /// # Errors
    ///
    /// - [`BoostError::Io`](crate::BoostError::Io) when the file cannot be read
    /// - [`BoostError::Format`](crate::BoostError::Format) when it is not a
    ///   valid model
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let booster = Self::load_from_reader(&mut reader)?;
        debug!(path = %path.display(), version = booster.version(), "model loaded");
        Ok(booster)
    }

    /// Read a model from any byte source. Consumes exactly one model.
    pub fn load_from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let (header, bytes) = read_framed(reader)?;
        let payload: Payload = postcard::from_bytes(&bytes).map_err(FormatError::from)?;
        payload.into_booster(&header)
    }

    /// Deserialize a model from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        Self::load_from_reader(&mut cursor)
    }

    fn format_header(&self) -> FormatHeader {
        let mut header = FormatHeader::new(
            self.n_features().unwrap_or(0) as u32,
            self.n_groups() as u32,
            self.version(),
        );
        if self.feature_names().is_some() {
            header.flags.set(FormatFlags::HAS_FEATURE_NAMES);
        }
        if !self.attributes().is_empty() {
            header.flags.set(FormatFlags::HAS_ATTRIBUTES);
        }
        header
    }
}

// ============================================================================
// Runtime -> Payload
// ============================================================================

impl Payload {
    pub(crate) fn from_booster(booster: &Booster) -> Self {
        let forest = booster.forest();
        Payload::V1(PayloadV1 {
            metadata: ModelMetadata {
                version: booster.version(),
                num_features: booster.n_features().map(|n| n as u32),
                feature_names: booster.feature_names().map(<[String]>::to_vec),
                config: booster
                    .config()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                attributes: booster
                    .attributes()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            forest: ForestPayload {
                num_groups: forest.n_groups(),
                base_scores: forest.base_score().to_vec(),
                tree_groups: forest.tree_groups().to_vec(),
                trees: forest.trees().map(TreePayload::from_tree).collect(),
            },
        })
    }

    pub(crate) fn into_booster(self, header: &FormatHeader) -> Result<Booster> {
        let Payload::V1(v1) = self;
        let PayloadV1 { metadata, forest } = v1;

        if metadata.version != header.model_version {
            return Err(corrupt(format!(
                "header version {} disagrees with payload version {}",
                header.model_version, metadata.version
            )));
        }
        if forest.num_groups != header.num_groups {
            return Err(corrupt(format!(
                "header declares {} groups, payload has {}",
                header.num_groups, forest.num_groups
            )));
        }

        let payload_features = metadata.num_features.unwrap_or(0);
        if payload_features != header.num_features {
            return Err(corrupt(format!(
                "header declares {} features, payload has {payload_features}",
                header.num_features
            )));
        }
        let flags_agree = header.flags.contains(FormatFlags::HAS_FEATURE_NAMES)
            == metadata.feature_names.is_some()
            && header.flags.contains(FormatFlags::HAS_ATTRIBUTES)
                == !metadata.attributes.is_empty();
        if !flags_agree {
            return Err(corrupt(format!(
                "header flags {:#06x} disagree with payload contents",
                header.flags.bits()
            )));
        }

        let trees = forest
            .trees
            .into_iter()
            .map(TreePayload::into_tree)
            .collect::<Result<Vec<_>>>()?;
        let forest = Forest::from_parts(forest.num_groups, forest.base_scores, trees, forest.tree_groups)
            .map_err(|e| corrupt(e.to_string()))?;

        let n_features = metadata.num_features.map(|n| n as usize);
        if let Some(n) = n_features {
            forest.validate_features(n).map_err(|e| corrupt(e.to_string()))?;
        }
        if let (Some(names), Some(n)) = (&metadata.feature_names, n_features) {
            if names.len() != n {
                return Err(corrupt(format!("{} feature names for {n} features", names.len())));
            }
        }

        let config: Config = metadata.config.into_iter().collect();
        let attributes: AttributeStore = metadata.attributes.into_iter().collect();

        Booster::from_parts(
            forest,
            config,
            attributes,
            metadata.feature_names,
            n_features,
            metadata.version,
        )
        .map_err(|e| corrupt(e.to_string()))
    }
}

impl TreePayload {
    fn from_tree(tree: &Tree) -> Self {
        Self {
            split_features: tree.split_indices().to_vec(),
            thresholds: tree.split_thresholds().to_vec(),
            left_children: tree.left_children().to_vec(),
            right_children: tree.right_children().to_vec(),
            default_left: tree.default_left_flags().to_vec(),
            is_leaf: tree.leaf_flags().to_vec(),
            leaf_values: tree.leaf_values().to_vec(),
            gains: tree.gains().to_vec(),
            covers: tree.covers().to_vec(),
        }
    }

    fn into_tree(self) -> Result<Tree> {
        Tree::new(
            self.split_features,
            self.thresholds,
            self.left_children,
            self.right_children,
            self.default_left,
            self.is_leaf,
            self.leaf_values,
            self.gains,
            self.covers,
        )
        .map_err(|e| corrupt(e.to_string()))
    }
}

fn corrupt(message: String) -> crate::BoostError {
    FormatError::CorruptPayload(message).into()
}
