use std::sync::atomic::{AtomicU16, Ordering};

static CDP_PORT_COUNTER: AtomicU16 = AtomicU16::new(9301);

/// Allocate the next remote-debugging port for a launched Chrome.
/// Starts above the conventional 9222 so we never collide with an external
/// Chrome the chooser might attach to; wraps around at 65500.
pub fn allocate_cdp_port() -> u16 {
    let port = CDP_PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    if port > 65500 {
        CDP_PORT_COUNTER.store(9301, Ordering::SeqCst);
        return 9301;
    }
    port
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_cdp_port_increments() {
        let p1 = allocate_cdp_port();
        let p2 = allocate_cdp_port();
        assert_eq!(p2, p1 + 1);
    }
}
