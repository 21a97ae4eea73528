//! Manifest diff operator.

use crate::error::{IndexError, IndexResult};
use rlookup_core::hash::ChecksumKind;
use rlookup_core::repodata::{PackageRecord, record_md5, record_sha256};

/// Action for one package, derived by comparing its historic record to the
/// current manifest record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageAction {
    /// Re-extract and rebuild the document, verifying the archive against
    /// `expected`.
    Update {
        kind: ChecksumKind,
        expected: String,
    },
    /// The record is unchanged; carry it forward into the new history.
    NoChange,
}

/// Decide what to do with one current-manifest record.
///
/// `sha256` is strictly preferred: it is compared whenever both sides carry
/// it, and `md5` is compared only when both sides carry md5 and sha256 does
/// not intersect. A sha256 on one side is never compared against an md5 on
/// the other; when the kinds do not intersect at all the package is treated
/// as changed and verified against the new side's preferred checksum.
///
/// Fails with [`IndexError::MissingChecksum`] when the new record carries
/// neither field; the caller skips such records.
pub fn package_action(
    old: Option<&PackageRecord>,
    new: &PackageRecord,
) -> IndexResult<PackageAction> {
    let new_sha = record_sha256(new);
    let new_md5 = record_md5(new);

    let (preferred_kind, preferred) = match (new_sha, new_md5) {
        (Some(sha), _) => (ChecksumKind::Sha256, sha),
        (None, Some(md5)) => (ChecksumKind::Md5, md5),
        (None, None) => return Err(IndexError::MissingChecksum),
    };

    let Some(old) = old else {
        return Ok(PackageAction::Update {
            kind: preferred_kind,
            expected: preferred.to_string(),
        });
    };

    if let (Some(new_sha), Some(old_sha)) = (new_sha, record_sha256(old)) {
        if new_sha == old_sha {
            return Ok(PackageAction::NoChange);
        }
        return Ok(PackageAction::Update {
            kind: ChecksumKind::Sha256,
            expected: new_sha.to_string(),
        });
    }

    if let (Some(new_md5), Some(old_md5)) = (new_md5, record_md5(old)) {
        if new_md5 == old_md5 {
            return Ok(PackageAction::NoChange);
        }
        return Ok(PackageAction::Update {
            kind: ChecksumKind::Md5,
            expected: new_md5.to_string(),
        });
    }

    // Hash kinds do not intersect; treat as changed.
    Ok(PackageAction::Update {
        kind: preferred_kind,
        expected: preferred.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> PackageRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_checksums_rejected() {
        let new = record(json!({ "size": 100 }));
        assert!(matches!(
            package_action(None, &new),
            Err(IndexError::MissingChecksum)
        ));
    }

    #[test]
    fn test_new_package_prefers_sha256() {
        let new = record(json!({ "sha256": "aa", "md5": "bb" }));
        assert_eq!(
            package_action(None, &new).unwrap(),
            PackageAction::Update {
                kind: ChecksumKind::Sha256,
                expected: "aa".to_string()
            }
        );
    }

    #[test]
    fn test_new_package_md5_only() {
        let new = record(json!({ "md5": "bb" }));
        assert_eq!(
            package_action(None, &new).unwrap(),
            PackageAction::Update {
                kind: ChecksumKind::Md5,
                expected: "bb".to_string()
            }
        );
    }

    #[test]
    fn test_matching_sha256_is_no_change() {
        let old = record(json!({ "sha256": "aa" }));
        let new = record(json!({ "sha256": "aa", "md5": "different" }));
        assert_eq!(
            package_action(Some(&old), &new).unwrap(),
            PackageAction::NoChange
        );
    }

    #[test]
    fn test_differing_sha256_updates() {
        let old = record(json!({ "sha256": "aa" }));
        let new = record(json!({ "sha256": "cc" }));
        assert_eq!(
            package_action(Some(&old), &new).unwrap(),
            PackageAction::Update {
                kind: ChecksumKind::Sha256,
                expected: "cc".to_string()
            }
        );
    }

    #[test]
    fn test_md5_compared_when_sha256_absent() {
        let old = record(json!({ "md5": "bb" }));
        let new = record(json!({ "md5": "bb" }));
        assert_eq!(
            package_action(Some(&old), &new).unwrap(),
            PackageAction::NoChange
        );

        let new = record(json!({ "md5": "dd" }));
        assert_eq!(
            package_action(Some(&old), &new).unwrap(),
            PackageAction::Update {
                kind: ChecksumKind::Md5,
                expected: "dd".to_string()
            }
        );
    }

    #[test]
    fn test_sha256_never_compared_against_md5() {
        // Old side only has md5, new side only sha256: treated as changed
        // and verified with the new side's sha256.
        let old = record(json!({ "md5": "bb" }));
        let new = record(json!({ "sha256": "aa" }));
        assert_eq!(
            package_action(Some(&old), &new).unwrap(),
            PackageAction::Update {
                kind: ChecksumKind::Sha256,
                expected: "aa".to_string()
            }
        );

        // And the other way around, with the new side's md5.
        let old = record(json!({ "sha256": "aa" }));
        let new = record(json!({ "md5": "bb" }));
        assert_eq!(
            package_action(Some(&old), &new).unwrap(),
            PackageAction::Update {
                kind: ChecksumKind::Md5,
                expected: "bb".to_string()
            }
        );
    }
}
