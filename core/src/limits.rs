//! Open-descriptor budget for socket-heavy scans.

/// Descriptors kept free for stdio, the runtime and subprocess pipes.
pub const FD_SAFETY_MARGIN: usize = 64;

/// Soft `RLIMIT_NOFILE` minus [`FD_SAFETY_MARGIN`], if the OS reports a
/// finite limit.
#[cfg(unix)]
pub fn descriptor_budget() -> Option<usize> {
    let (soft, _hard) = rlimit::Resource::NOFILE.get().ok()?;
    budget_from_soft(soft)
}

#[cfg(unix)]
fn budget_from_soft(soft: u64) -> Option<usize> {
    if soft == rlimit::INFINITY {
        return None;
    }
    let soft = usize::try_from(soft).ok()?;
    Some(soft.saturating_sub(FD_SAFETY_MARGIN).max(1))
}

#[cfg(not(unix))]
pub fn descriptor_budget() -> Option<usize> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_positive_when_reported() {
        if let Some(b) = descriptor_budget() {
            assert!(b >= 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn margin_comes_off_the_soft_limit() {
        assert_eq!(budget_from_soft(1024), Some(960));
        assert_eq!(budget_from_soft(10), Some(1));
        assert_eq!(budget_from_soft(rlimit::INFINITY), None);
    }
}
