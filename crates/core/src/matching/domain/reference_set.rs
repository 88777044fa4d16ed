use crate::matching::domain::fingerprint::{Fingerprint, FingerprintScheme};
use crate::matching::domain::matcher::{compare, MatchConfig, MatchError};

/// Ordered set of fingerprints the user wants suppressed.
///
/// Replaced wholesale on update; read-only to the scheduler during a
/// scan. Construction rejects mixed variants so a misconfigured
/// deployment fails at update time rather than mid-scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceSet {
    fingerprints: Vec<Fingerprint>,
}

impl ReferenceSet {
    pub fn new(fingerprints: Vec<Fingerprint>) -> Result<Self, MatchError> {
        if let Some(first) = fingerprints.first() {
            let scheme = first.scheme();
            for fp in &fingerprints[1..] {
                if fp.scheme() != scheme {
                    return Err(MatchError::VariantMismatch {
                        left: scheme,
                        right: fp.scheme(),
                    });
                }
            }
        }
        Ok(Self { fingerprints })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    pub fn scheme(&self) -> Option<FingerprintScheme> {
        self.fingerprints.first().map(Fingerprint::scheme)
    }

    /// True if any candidate matches any reference. Short-circuits on the
    /// first match; order never affects the boolean outcome.
    pub fn matches_any(
        &self,
        candidates: &[Fingerprint],
        config: &MatchConfig,
    ) -> Result<bool, MatchError> {
        for candidate in candidates {
            for reference in &self.fingerprints {
                if compare(candidate, reference, config)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::domain::fingerprint::landmark_hash;
    use crate::shared::bounding_box::BoundingBox;

    fn embedding_fp(vector: Vec<f32>) -> Fingerprint {
        Fingerprint::Embedding {
            vector,
            bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        }
    }

    fn hash_fp(landmarks: Vec<(f64, f64)>) -> Fingerprint {
        Fingerprint::HashLandmark {
            hash: landmark_hash(&landmarks),
            landmarks,
            bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        }
    }

    #[test]
    fn test_new_rejects_mixed_variants() {
        let err = ReferenceSet::new(vec![
            embedding_fp(vec![0.1]),
            hash_fp(vec![(0.5, 0.5)]),
        ])
        .unwrap_err();
        assert!(matches!(err, MatchError::VariantMismatch { .. }));
    }

    #[test]
    fn test_new_accepts_uniform_variants() {
        let set =
            ReferenceSet::new(vec![embedding_fp(vec![0.1]), embedding_fp(vec![0.2])]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.scheme(), Some(FingerprintScheme::Embedding));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = ReferenceSet::empty();
        let config = MatchConfig::default();
        assert!(!set
            .matches_any(&[embedding_fp(vec![0.0, 0.0])], &config)
            .unwrap());
    }

    #[test]
    fn test_matches_any_finds_later_reference() {
        let far = embedding_fp(vec![10.0, 10.0]);
        let near = embedding_fp(vec![0.0, 0.0]);
        let set = ReferenceSet::new(vec![far, near]).unwrap();
        let candidate = embedding_fp(vec![0.1, 0.1]);
        assert!(set
            .matches_any(&[candidate], &MatchConfig::default())
            .unwrap());
    }

    #[test]
    fn test_matches_any_propagates_contract_errors() {
        let set = ReferenceSet::new(vec![embedding_fp(vec![0.1, 0.2])]).unwrap();
        let candidate = embedding_fp(vec![0.1]);
        assert!(set
            .matches_any(&[candidate], &MatchConfig::default())
            .is_err());
    }

    #[test]
    fn test_matches_any_no_candidates() {
        let set = ReferenceSet::new(vec![embedding_fp(vec![0.1])]).unwrap();
        assert!(!set.matches_any(&[], &MatchConfig::default()).unwrap());
    }
}
