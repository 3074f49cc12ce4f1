//! Stable volume naming and the flavor/DevServer volume-merge rule.

use devserver_types::DevServerVolume;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

pub const HOME_MOUNT_PATH: &str = "/home/dev";

fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_dash = false;
    for c in value.chars() {
        let lower = c.to_ascii_lowercase();
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() {
            out.push(lower);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// DNS-1123-safe, stable name for a volume derived from its claim and mount
/// path. Names longer than 63 characters are truncated with a short SHA1
/// suffix so distinct inputs don't collide after truncation.
pub fn stable_volume_name(claim_name: &str, mount_path: &str) -> String {
    let sanitized_path = sanitize(mount_path.trim_start_matches('/'));
    let mut raw_name = format!("vol-{claim_name}");
    if !sanitized_path.is_empty() {
        raw_name = format!("{raw_name}-{sanitized_path}");
    }

    let sanitized = {
        let s = sanitize(&raw_name);
        if s.is_empty() { "vol".to_string() } else { s }
    };
    if sanitized.len() <= 63 {
        return sanitized;
    }

    let mut hasher = Sha1::new();
    hasher.update(raw_name.as_bytes());
    let hash_suffix = hex::encode(hasher.finalize())[..6].to_string();

    let trim_len = (63usize.saturating_sub(hash_suffix.len() + 1)).max(1);
    let mut prefix = sanitized[..trim_len.min(sanitized.len())].trim_end_matches('-').to_string();
    if prefix.is_empty() {
        prefix = sanitized[..trim_len.min(sanitized.len())].to_string();
    }
    format!("{prefix}-{hash_suffix}")
}

/// Merges the flavor's baseline volumes with the DevServer's own overlay by
/// `mountPath`, the DevServer's entry winning on conflict. Order is
/// flavor-volumes-first, then any DevServer volumes not already present.
pub fn merge_volumes(
    flavor_volumes: &[DevServerVolume],
    devserver_volumes: &[DevServerVolume],
) -> Vec<DevServerVolume> {
    let mut merged: BTreeMap<String, DevServerVolume> = BTreeMap::new();
    for v in flavor_volumes {
        merged.insert(v.mount_path.clone(), v.clone());
    }
    for v in devserver_volumes {
        merged.insert(v.mount_path.clone(), v.clone());
    }
    // Preserve flavor-first, then-devserver-only ordering rather than the
    // BTreeMap's alphabetical order.
    let mut ordered = Vec::with_capacity(merged.len());
    let mut seen = std::collections::HashSet::new();
    for v in flavor_volumes.iter().chain(devserver_volumes.iter()) {
        if seen.insert(v.mount_path.clone()) {
            ordered.push(merged.remove(&v.mount_path).unwrap());
        }
    }
    ordered
}

/// Whether the merged volume list already covers `/home/dev`, in which case
/// the builder must not also mount a default `emptyDir` there.
pub fn home_volume_specified(volumes: &[DevServerVolume]) -> bool {
    volumes.iter().any(|v| v.mount_path == HOME_MOUNT_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vol(claim: &str, path: &str) -> DevServerVolume {
        DevServerVolume {
            claim_name: claim.to_string(),
            mount_path: path.to_string(),
            read_only: false,
        }
    }

    #[test]
    fn devserver_volume_overrides_flavor_on_conflict() {
        let flavor = vec![vol("flavor-claim", "/data")];
        let user = vec![vol("user-claim", "/data")];
        let merged = merge_volumes(&flavor, &user);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].claim_name, "user-claim");
    }

    #[test]
    fn disjoint_volumes_are_concatenated_flavor_first() {
        let flavor = vec![vol("a", "/a")];
        let user = vec![vol("b", "/b")];
        let merged = merge_volumes(&flavor, &user);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].mount_path, "/a");
        assert_eq!(merged[1].mount_path, "/b");
    }

    #[test]
    fn stable_name_is_deterministic() {
        let a = stable_volume_name("my-claim", "/home/dev");
        let b = stable_volume_name("my-claim", "/home/dev");
        assert_eq!(a, b);
        assert_eq!(a, "vol-my-claim-home-dev");
    }

    #[test]
    fn stable_name_truncates_with_hash_suffix_past_63_chars() {
        let claim = "a".repeat(80);
        let name = stable_volume_name(&claim, "/mnt/data");
        assert!(name.len() <= 63);
        // Changing the mount path for the same long claim must still yield a
        // distinct name post-truncation.
        let name2 = stable_volume_name(&claim, "/mnt/other");
        assert_ne!(name, name2);
    }

    #[test]
    fn home_volume_detection() {
        assert!(home_volume_specified(&[vol("c", HOME_MOUNT_PATH)]));
        assert!(!home_volume_specified(&[vol("c", "/data")]));
    }

    #[test]
    fn sanitize_collapses_invalid_chars() {
        assert_eq!(sanitize("My_Weird..Path//here"), "my-weird-path-here");
    }
}
