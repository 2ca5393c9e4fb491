//! Status codec
//!
//! Static bijection between local request statuses and CRM numeric status
//! ids. Unknown inbound ids map to Open: the CRM may grow pipeline stages
//! we do not track, and a tolerant default keeps ingestion alive.

use crate::models::request::RequestStatus;

const STATUS_MAP: &[(RequestStatus, i64)] = &[
    (RequestStatus::Open, 65736946),
    (RequestStatus::InProgress, 63819782),
    (RequestStatus::Cancelled, 63819786),
    (RequestStatus::Completed, 142),
    (RequestStatus::Free, 63819778),
    (RequestStatus::AwaitingClosure, 72644046),
    (RequestStatus::Closed, 143),
    (RequestStatus::QualityControl, 67450158),
];

/// Decode a CRM status id into a local status, defaulting to Open
pub fn decode_status(status_id: i64) -> RequestStatus {
    STATUS_MAP
        .iter()
        .find(|(_, id)| *id == status_id)
        .map(|(status, _)| *status)
        .unwrap_or(RequestStatus::Open)
}

/// Encode a local status into its CRM status id
pub fn encode_status(status: RequestStatus) -> i64 {
    STATUS_MAP
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, id)| *id)
        .expect("every status has a CRM id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bijection() {
        for (status, id) in STATUS_MAP {
            assert_eq!(decode_status(*id), *status);
            assert_eq!(encode_status(*status), *id);
        }
    }

    #[test]
    fn test_unknown_id_decodes_to_open() {
        assert_eq!(decode_status(999999), RequestStatus::Open);
        assert_eq!(decode_status(0), RequestStatus::Open);
    }

    #[test]
    fn test_known_ids() {
        assert_eq!(decode_status(63819778), RequestStatus::Free);
        assert_eq!(decode_status(142), RequestStatus::Completed);
        assert_eq!(encode_status(RequestStatus::Closed), 143);
    }
}
