//! VoIP custom fields shared by every provider mapping.

use push_core::{DispatchError, PeerType, VoipPush};
use serde_json::{Value, json};

/// Wire code of a peer type.
pub fn peer_type_code(peer_type: PeerType) -> i32 {
    match peer_type {
        PeerType::Unknown => 0,
        PeerType::Private => 1,
        PeerType::Group => 2,
        PeerType::Sip => 3,
    }
}

/// Reject VoIP pushes on credentials that cannot carry them.
pub(crate) fn require_voip(supports_voip: bool) -> Result<(), DispatchError> {
    if supports_voip {
        Ok(())
    } else {
        Err(DispatchError::UnsupportedCapability(
            "attempted voip-push using non-voip credential".to_string(),
        ))
    }
}

/// Custom fields for a VoIP push, in wire order.
pub(crate) fn voip_fields(src: &VoipPush) -> Vec<(&'static str, Value)> {
    let mut fields = vec![
        ("callId", Value::from(src.call_id.to_string())),
        ("callIdStr", Value::from(src.call_id_str.as_str())),
        ("attemptIndex", Value::from(src.attempt_index)),
        ("displayName", Value::from(src.display_name.as_str())),
        ("eventBusId", Value::from(src.event_bus_id.as_str())),
        ("updateType", Value::from(src.update_type.as_str())),
        ("disposalReason", Value::from(src.disposal_reason.as_str())),
        ("video", Value::from(src.video)),
        ("token", Value::from(src.token.as_str())),
        ("endpoint", Value::from(src.endpoint.as_str())),
    ];

    if let Some(peer) = &src.peer {
        fields.push((
            "peer",
            json!({
                "id": peer.id.to_string(),
                "type": peer_type_code(peer.peer_type).to_string(),
                "strId": peer.str_id,
            }),
        ));
    }

    if let Some(out_peer) = &src.out_peer {
        fields.push((
            "outPeer",
            json!({
                "id": out_peer.id.to_string(),
                "type": peer_type_code(out_peer.peer_type).to_string(),
                "accessHash": out_peer.access_hash.to_string(),
                "strId": out_peer.str_id,
            }),
        ));
    }

    if let Some(merge) = &src.merge {
        fields.push((
            "merge",
            json!({
                "key": merge.key,
                "merge": merge.merge.to_string(),
            }),
        ));
    }

    fields
}

#[cfg(test)]
mod tests {
    use push_core::{Merge, OutPeer, Peer};

    use super::*;

    #[test]
    fn test_optional_fields_absent() {
        let fields = voip_fields(&VoipPush::default());
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[0], ("callId", Value::from("0")));
    }

    #[test]
    fn test_peers_and_merge() {
        let src = VoipPush {
            peer: Some(Peer {
                id: 42,
                peer_type: PeerType::Group,
                str_id: "g42".into(),
            }),
            out_peer: Some(OutPeer {
                id: 7,
                peer_type: PeerType::Private,
                access_hash: -99,
                str_id: "u7".into(),
            }),
            merge: Some(Merge {
                key: "call-1".into(),
                merge: false,
            }),
            ..Default::default()
        };

        let fields = voip_fields(&src);
        let get = |name: &str| fields.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone());

        assert_eq!(
            get("peer"),
            Some(json!({"id": "42", "type": "2", "strId": "g42"}))
        );
        assert_eq!(
            get("outPeer"),
            Some(json!({"id": "7", "type": "1", "accessHash": "-99", "strId": "u7"}))
        );
        assert_eq!(get("merge"), Some(json!({"key": "call-1", "merge": "false"})));
    }

    #[test]
    fn test_require_voip() {
        assert!(require_voip(true).is_ok());
        assert!(matches!(
            require_voip(false),
            Err(DispatchError::UnsupportedCapability(_))
        ));
    }
}
