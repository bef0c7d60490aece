//! Privilege constants and defaults

/// Separator between an entry key and a role name ("system.clear_cache")
pub const ROLE_SEPARATOR: char = '.';

/// Holding this privilege grants everything
pub const ADMIN_PRIVILEGE: &str = "*";

// Granted to every saved role regardless of selection
pub const DEFAULT_REQUIRED_PRIVILEGES: &[&str] = &[
    "language:read",
    "locale:read",
    "log_entry:create",
    "message_queue_stats:read",
];

// Verification tokens are short-lived (5 minutes)
pub const DEFAULT_VERIFICATION_TTL_SECS: u64 = 300;

/// Merge the default required privileges with extra ones, keeping order
pub fn required_privileges(extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = DEFAULT_REQUIRED_PRIVILEGES.iter().map(|s| s.to_string()).collect();
    for p in extra {
        if !out.contains(p) {
            out.push(p.clone());
        }
    }
    out
}
