use model::Identity;

/// Name prefixes of on-board devices, highest priority first.
pub const ONBOARD_PREFIXES: &[&str] = &[
    "NisshinEisei-OBD-",
    "HinodeEisei-OBD-",
    "Nikkan-OBD-",
    "ToyotaEisei-OBD-",
];

/// Fixed sensor codes, matched only when no prefix applies.
pub const SENSOR_CODES: &[&str] = &[
    "600002", "600003", "600004", "600006", "600009", "600010", "600011", "600012", "600020",
    "600021", "600022", "600023", "600024", "600025",
];

/// Maps a raw identifier token to its identity; [`Identity::UNRESOLVED`] when nothing matches.
pub fn resolve_identity(token: &str) -> Identity {
    let mut identity = onboard_identity(token).unwrap_or(Identity::UNRESOLVED);
    if !identity.is_resolved() {
        identity = sensor_identity(token).unwrap_or(Identity::UNRESOLVED);
    }
    identity
}

fn onboard_identity(token: &str) -> Option<Identity> {
    let suffix = ONBOARD_PREFIXES.iter().find_map(|p| token.strip_prefix(p))?;
    // an unparsable suffix counts as device 0
    let n = suffix.parse::<i64>().unwrap_or(0);
    Some(Identity::onboard(n))
}

fn sensor_identity(token: &str) -> Option<Identity> {
    SENSOR_CODES
        .iter()
        .find(|code| **code == token)
        .and_then(|code| code.parse::<i32>().ok())
        .map(Identity)
}
