//! Default data-center endpoints
//!
//! Formats that embed a server endpoint resolve it from this table when the
//! record does not carry an explicit one. Addresses match the defaults
//! shipped by the upstream clients.

use crate::{Error, Result};

/// Production datacenter addresses
const PROD_ADDRESSES: [(i32, &str, u16); 5] = [
    (1, "149.154.175.53", 443),
    (2, "149.154.167.51", 443),
    (3, "149.154.175.100", 443),
    (4, "149.154.167.91", 443),
    (5, "91.108.56.130", 443),
];

/// Test-cluster datacenter addresses (only DCs 1-3 exist on the test network)
const TEST_ADDRESSES: [(i32, &str, u16); 3] = [
    (1, "149.154.175.10", 443),
    (2, "149.154.167.40", 443),
    (3, "149.154.175.117", 443),
];

/// Resolve the default endpoint for a data center
///
/// Fails with [`Error::UnknownDc`] when the pair has no configured endpoint,
/// which a caller must surface rather than guess around.
pub fn default_endpoint(dc_id: i32, test_mode: bool) -> Result<(&'static str, u16)> {
    let table: &[(i32, &str, u16)] = if test_mode {
        &TEST_ADDRESSES
    } else {
        &PROD_ADDRESSES
    };

    table
        .iter()
        .find(|(id, _, _)| *id == dc_id)
        .map(|(_, addr, port)| (*addr, *port))
        .ok_or(Error::UnknownDc { dc_id, test_mode })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_endpoint() {
        assert_eq!(default_endpoint(2, false).unwrap(), ("149.154.167.51", 443));
        assert_eq!(default_endpoint(5, false).unwrap(), ("91.108.56.130", 443));
    }

    #[test]
    fn test_test_cluster_endpoint() {
        assert_eq!(default_endpoint(2, true).unwrap(), ("149.154.167.40", 443));
    }

    #[test]
    fn test_unknown_dc() {
        assert!(matches!(
            default_endpoint(9, false),
            Err(Error::UnknownDc { dc_id: 9, test_mode: false })
        ));
        // DC 4 only exists on the production network
        assert!(matches!(
            default_endpoint(4, true),
            Err(Error::UnknownDc { dc_id: 4, test_mode: true })
        ));
    }
}
