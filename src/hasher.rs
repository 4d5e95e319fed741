//! Recipe hashing utilities.
//!
//! This module provides the [`ActionHasher`] type used to compute a stable
//! SHA-256 digest for the part of a [`Rule`] that becomes a Ninja `rule`
//! block: its commands and dependency file. Identical recipes share a digest,
//! so the generator emits each block once.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8PathBuf;
//! use rulegraph::hasher::ActionHasher;
//! use rulegraph::ir::{Recipe, Rule};
//!
//! let rule = Rule {
//!     target: Utf8PathBuf::from("out"),
//!     inputs: Vec::new(),
//!     recipe: Recipe::command(["true"]),
//!     depfile: None,
//! };
//! let hash = ActionHasher::hash(&rule);
//! assert_eq!(hash.len(), 64);
//! ```

use sha2::{Digest, Sha256};

use crate::ir::{Recipe, Rule};

/// Computes stable digests for rule recipes.
pub struct ActionHasher;

impl ActionHasher {
    /// Calculate the hash of a rule's recipe and dependency file.
    #[must_use]
    pub fn hash(rule: &Rule) -> String {
        let mut hasher = Sha256::new();
        Self::hash_recipe(&mut hasher, &rule.recipe);
        match &rule.depfile {
            Some(depfile) => {
                hasher.update(b"1");
                Self::update_with_len(&mut hasher, depfile.as_str().as_bytes());
            }
            None => hasher.update(b"0"),
        }
        format!("{:x}", hasher.finalize())
    }

    fn hash_recipe(hasher: &mut Sha256, recipe: &Recipe) {
        match recipe {
            Recipe::Commands { commands } => {
                hasher.update(b"cmds");
                Self::update_len(hasher, commands.len());
                for argv in commands {
                    Self::update_len(hasher, argv.len());
                    for word in argv {
                        Self::update_with_len(hasher, word.as_bytes());
                    }
                }
            }
            Recipe::Aggregate => hasher.update(b"aggregate"),
        }
    }

    fn update_len(hasher: &mut Sha256, len: usize) {
        hasher.update(format!("{len}:").as_bytes());
    }

    fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
        Self::update_len(hasher, bytes.len());
        hasher.update(bytes);
    }
}
