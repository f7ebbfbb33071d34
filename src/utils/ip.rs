//! Client IP preference for analytics.
//!
//! The forwarded-for header wins when present: its first entry is the
//! original client as seen by the outermost proxy. Otherwise the direct
//! peer address is used. Both are optional; a visitor with neither is
//! still counted, just under an empty fingerprint.

/// First non-empty forwarded-for entry, else the peer address.
pub fn preferred_client_ip(
    forwarded_for: Option<&str>,
    remote_addr: Option<&str>,
) -> Option<String> {
    if let Some(xff) = forwarded_for {
        if let Some(first) = xff.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }
    remote_addr.map(str::to_string)
}
