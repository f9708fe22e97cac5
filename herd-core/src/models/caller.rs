//! Caller roles, resolved once per request by the record store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl MembershipStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerRole {
    Owner { user_id: i64, farm_id: i64 },
    Labourer {
        user_id: i64,
        farm_id: Option<i64>,
        status: MembershipStatus,
    },
    Unaffiliated { user_id: i64 },
}

impl CallerRole {
    pub fn user_id(&self) -> i64 {
        match self {
            Self::Owner { user_id, .. }
            | Self::Labourer { user_id, .. }
            | Self::Unaffiliated { user_id } => *user_id,
        }
    }

    /// Farm owned by the caller, if any.
    pub fn owned_farm(&self) -> Option<i64> {
        match self {
            Self::Owner { farm_id, .. } => Some(*farm_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_has_owned_farm() {
        let role = CallerRole::Owner { user_id: 1, farm_id: 10 };
        assert_eq!(role.owned_farm(), Some(10));
        assert_eq!(role.user_id(), 1);
    }

    #[test]
    fn test_pending_labourer_owns_nothing() {
        let role = CallerRole::Labourer {
            user_id: 2,
            farm_id: Some(10),
            status: MembershipStatus::Pending,
        };
        assert_eq!(role.owned_farm(), None);
        assert_eq!(role.user_id(), 2);
    }

    #[test]
    fn test_approved_labourer_is_not_owner() {
        let role = CallerRole::Labourer {
            user_id: 3,
            farm_id: Some(10),
            status: MembershipStatus::Approved,
        };
        assert_eq!(role.owned_farm(), None);
    }

    #[test]
    fn test_membership_status_parse() {
        assert_eq!(MembershipStatus::parse("approved"), Some(MembershipStatus::Approved));
        assert_eq!(MembershipStatus::parse("pending"), Some(MembershipStatus::Pending));
        assert_eq!(MembershipStatus::parse("unknown"), None);
    }
}
