use std::collections::HashMap;

use crate::db::models::{Account, Group};

/// pure reassignment function: every active group gets exactly one account,
/// each account's count is within ±1 of the tenant mean, ties broken by
/// lower id. No I/O, unit-tested directly.
pub fn assign(groups: &[Group], accounts: &[Account]) -> HashMap<i32, i32> {
    let mut assignment = HashMap::new();
    if accounts.is_empty() {
        return assignment;
    }

    let mut account_ids: Vec<i32> = accounts.iter().map(|a| a.id).collect();
    account_ids.sort_unstable();

    let mut sorted_groups: Vec<&Group> = groups.iter().filter(|g| g.is_active).collect();
    sorted_groups.sort_by_key(|g| g.id);

    let mut load: HashMap<i32, usize> = account_ids.iter().map(|id| (*id, 0)).collect();

    for group in sorted_groups {
        let account_id = *account_ids
            .iter()
            .min_by_key(|id| (load[id], **id))
            .expect("account_ids is non-empty");
        assignment.insert(group.id, account_id);
        *load.get_mut(&account_id).unwrap() += 1;
    }

    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::db::models::{AccountStatus, GroupType};

    fn group(id: i32) -> Group {
        Group {
            id,
            tenant_id: 1,
            group_id: format!("-100{id}"),
            group_name: format!("g{id}"),
            group_type: GroupType::Supergroup,
            invite_link: None,
            description: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn account(id: i32) -> Account {
        Account {
            id,
            tenant_id: 1,
            name: format!("acct{id}"),
            session_artifact_path: String::new(),
            metadata_artifact_path: String::new(),
            phone_number: None,
            username: None,
            first_name: None,
            last_name: None,
            status: AccountStatus::Active,
            last_error: None,
            assigned_group_ids: vec![],
            created_at: Utc::now(),
            last_activity: None,
        }
    }

    #[test]
    fn balances_within_one_across_accounts() {
        let groups: Vec<Group> = (1..=7).map(group).collect();
        let accounts: Vec<Account> = (1..=3).map(account).collect();
        let assignment = assign(&groups, &accounts);

        assert_eq!(assignment.len(), 7);
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for account_id in assignment.values() {
            *counts.entry(*account_id).or_default() += 1;
        }
        let max = *counts.values().max().unwrap();
        let min = *counts.values().min().unwrap();
        assert!(max - min <= 1);
    }

    #[test]
    fn ignores_inactive_groups() {
        let mut groups: Vec<Group> = (1..=3).map(group).collect();
        groups[2].is_active = false;
        let accounts = vec![account(1)];
        let assignment = assign(&groups, &accounts);
        assert_eq!(assignment.len(), 2);
        assert!(!assignment.contains_key(&3));
    }

    #[test]
    fn empty_accounts_yields_no_assignment() {
        let groups: Vec<Group> = (1..=3).map(group).collect();
        assert!(assign(&groups, &[]).is_empty());
    }
}
