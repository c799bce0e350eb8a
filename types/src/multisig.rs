//! Multi-signature descriptor.
//!
//! Two registration schemes exist on the ledgers the engine talks to: a
//! simple "min of N" scheme, and an advanced scheme where some signers are
//! mandatory and the rest optional.

use serde::{Deserialize, Serialize};

use crate::PublicKey;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MultiSignatureDescriptor {
    /// Any `min` of `public_keys` must sign.
    Simple { min: u32, public_keys: Vec<PublicKey> },
    /// Every mandatory key must sign, and `number_of_signatures` signatures
    /// are needed in total.
    Advanced {
        mandatory_keys: Vec<PublicKey>,
        optional_keys: Vec<PublicKey>,
        number_of_signatures: u32,
    },
}

impl MultiSignatureDescriptor {
    /// Flatten either scheme into one participant list.
    ///
    /// Advanced descriptors list mandatory keys first, each list in its
    /// original order, without deduplication.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        match self {
            Self::Simple { public_keys, .. } => public_keys.clone(),
            Self::Advanced {
                mandatory_keys,
                optional_keys,
                ..
            } => mandatory_keys
                .iter()
                .chain(optional_keys.iter())
                .cloned()
                .collect(),
        }
    }

    /// Number of signatures required to reach quorum.
    pub fn threshold(&self) -> u32 {
        match self {
            Self::Simple { min, .. } => *min,
            Self::Advanced {
                number_of_signatures,
                ..
            } => *number_of_signatures,
        }
    }

    pub fn participant_count(&self) -> usize {
        match self {
            Self::Simple { public_keys, .. } => public_keys.len(),
            Self::Advanced {
                mandatory_keys,
                optional_keys,
                ..
            } => mandatory_keys.len() + optional_keys.len(),
        }
    }

    pub fn is_participant(&self, key: &PublicKey) -> bool {
        self.public_keys().contains(key)
    }

    /// Keys whose signature is required regardless of the threshold.
    pub fn mandatory_keys(&self) -> &[PublicKey] {
        match self {
            Self::Simple { .. } => &[],
            Self::Advanced { mandatory_keys, .. } => mandatory_keys,
        }
    }

    pub fn is_mandatory(&self, key: &PublicKey) -> bool {
        self.mandatory_keys().contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<PublicKey> {
        names.iter().map(|n| PublicKey::from(*n)).collect()
    }

    #[test]
    fn simple_flattens_verbatim() {
        let d = MultiSignatureDescriptor::Simple {
            min: 2,
            public_keys: keys(&["a", "b"]),
        };
        assert_eq!(d.public_keys(), keys(&["a", "b"]));
        assert_eq!(d.threshold(), 2);
        assert!(d.mandatory_keys().is_empty());
    }

    #[test]
    fn advanced_puts_mandatory_first() {
        let d = MultiSignatureDescriptor::Advanced {
            mandatory_keys: keys(&["a", "b"]),
            optional_keys: keys(&["c", "d"]),
            number_of_signatures: 2,
        };
        assert_eq!(d.public_keys(), keys(&["a", "b", "c", "d"]));
        assert!(d.is_mandatory(&"b".into()));
        assert!(!d.is_mandatory(&"c".into()));
    }

    #[test]
    fn advanced_keeps_duplicates() {
        let d = MultiSignatureDescriptor::Advanced {
            mandatory_keys: keys(&["a"]),
            optional_keys: keys(&["a", "b"]),
            number_of_signatures: 1,
        };
        assert_eq!(d.public_keys(), keys(&["a", "a", "b"]));
        assert_eq!(d.participant_count(), 3);
    }

    #[test]
    fn tagged_serde_shape() {
        let json = r#"{"kind":"simple","min":1,"public_keys":["x"]}"#;
        let d: MultiSignatureDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.public_keys(), keys(&["x"]));
    }
}
