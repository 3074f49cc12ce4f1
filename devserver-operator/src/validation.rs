//! Validation and normalization for `DevServer` specs (C4), grounded on
//! `validation.py`. Failures here are permanent: no amount of retrying an
//! unchanged spec will make it valid.

use devserver_types::DevServerVolume;
use std::time::Duration;

use crate::util::Error;

const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Validates a `spec.lifecycle.timeToLive` string: must parse, be strictly
/// positive, and not exceed 7 days.
pub fn validate_ttl(ttl: Option<&str>) -> Result<(), Error> {
    let Some(ttl) = ttl else {
        return Ok(());
    };
    let duration = parse_duration::parse(ttl)
        .map_err(|source| Error::UserInput(format!("timeToLive '{ttl}' is not a valid duration: {source}")))?;
    if duration.is_zero() {
        return Err(Error::UserInput(format!(
            "timeToLive must be a positive duration, got '{ttl}'"
        )));
    }
    if duration > MAX_TTL {
        return Err(Error::UserInput(format!(
            "timeToLive '{ttl}' exceeds the maximum of 7 days"
        )));
    }
    Ok(())
}

/// Validates that every volume has a unique, non-empty `mountPath`.
pub fn validate_volumes(volumes: &[DevServerVolume]) -> Result<(), Error> {
    let mut seen = std::collections::HashSet::new();
    for (idx, volume) in volumes.iter().enumerate() {
        if volume.mount_path.is_empty() {
            return Err(Error::UserInput(format!(
                "volume at index {idx} is missing required field mountPath"
            )));
        }
        if !seen.insert(volume.mount_path.as_str()) {
            return Err(Error::UserInput(format!(
                "duplicate mount path '{}' is not allowed; each volume must have a unique mount path",
                volume.mount_path
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vol(path: &str) -> DevServerVolume {
        DevServerVolume {
            claim_name: "claim".to_string(),
            mount_path: path.to_string(),
            read_only: false,
        }
    }

    #[test]
    fn no_ttl_is_valid() {
        assert!(validate_ttl(None).is_ok());
    }

    #[test]
    fn valid_ttl_strings_parse() {
        assert!(validate_ttl(Some("4h")).is_ok());
        assert!(validate_ttl(Some("1h30m")).is_ok());
        assert!(validate_ttl(Some("7d")).is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(validate_ttl(Some("0s")).is_err());
    }

    #[test]
    fn ttl_over_seven_days_is_rejected() {
        assert!(validate_ttl(Some("8d")).is_err());
    }

    #[test]
    fn garbage_ttl_is_rejected() {
        assert!(validate_ttl(Some("not-a-duration")).is_err());
    }

    #[test]
    fn no_volumes_is_valid() {
        assert!(validate_volumes(&[]).is_ok());
    }

    #[test]
    fn unique_mount_paths_are_valid() {
        assert!(validate_volumes(&[vol("/a"), vol("/b")]).is_ok());
    }

    #[test]
    fn duplicate_mount_paths_are_rejected() {
        let err = validate_volumes(&[vol("/a"), vol("/a")]).unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }

    #[test]
    fn empty_mount_path_is_rejected() {
        assert!(validate_volumes(&[vol("")]).is_err());
    }
}
