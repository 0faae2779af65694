use std::collections::HashMap;

use crate::shares::Share;
use crate::types::RequestId;

/// Collects decryption shares per disclosure request until the committee
/// threshold is reached.
#[derive(Debug)]
pub struct ShareCollector {
    threshold: usize,
    collected: HashMap<RequestId, Vec<Share>>,
}

impl ShareCollector {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            collected: HashMap::new(),
        }
    }

    /// Adds a share; a second share from the same member is ignored.
    pub fn submit_share(&mut self, request_id: RequestId, share: Share) {
        let shares = self.collected.entry(request_id).or_default();
        if shares.iter().all(|s| s.id != share.id) {
            shares.push(share);
        }
    }

    pub fn can_decrypt(&self, request_id: &RequestId) -> bool {
        self.collected
            .get(request_id)
            .is_some_and(|shares| shares.len() >= self.threshold)
    }

    pub fn share_count(&self, request_id: &RequestId) -> usize {
        self.collected.get(request_id).map_or(0, Vec::len)
    }

    /// Removes and returns the shares collected for a request.
    pub fn take(&mut self, request_id: &RequestId) -> Vec<Share> {
        self.collected.remove(request_id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_reached_after_distinct_shares() {
        let rid = RequestId([1u8; 32]);
        let mut collector = ShareCollector::new(2);

        collector.submit_share(rid, Share::new(1, [0u8; 32]));
        collector.submit_share(rid, Share::new(1, [0u8; 32]));
        assert!(!collector.can_decrypt(&rid));
        assert_eq!(collector.share_count(&rid), 1);

        collector.submit_share(rid, Share::new(3, [0u8; 32]));
        assert!(collector.can_decrypt(&rid));

        assert_eq!(collector.take(&rid).len(), 2);
        assert_eq!(collector.share_count(&rid), 0);
    }
}
