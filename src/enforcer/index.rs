//! In-memory policy index evaluated by the enforcer

use crate::domain::{GroupingGrant, PolicyGrant, PolicyRule};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Snapshot of every grant and grouping.
///
/// Published behind an `Arc` and never mutated while shared; writers clone
/// (copy-on-write) before changing it.
#[derive(Debug, Clone, Default)]
pub struct PolicyIndex {
    /// subject -> {(object, action)}
    grants: HashMap<String, HashSet<(String, String)>>,
    /// subject -> roles, in a stable order
    groupings: HashMap<String, BTreeSet<String>>,
}

impl PolicyIndex {
    pub fn build(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let mut index = Self::default();
        for rule in rules {
            match rule {
                PolicyRule::Grant(grant) => index.insert_grant(&grant),
                PolicyRule::Grouping(grouping) => index.insert_grouping(&grouping),
            }
        }
        index
    }

    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> bool {
        self.subject_chain(subject).iter().any(|s| {
            self.grants
                .get(s.as_str())
                .map(|set| set.contains(&(object.to_string(), action.to_string())))
                .unwrap_or(false)
        })
    }

    /// The subject followed by every role reachable through groupings
    fn subject_chain(&self, subject: &str) -> Vec<String> {
        let mut chain = vec![subject.to_string()];
        let mut visited: HashSet<String> = HashSet::from([subject.to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([subject.to_string()]);

        while let Some(current) = queue.pop_front() {
            if let Some(roles) = self.groupings.get(&current) {
                for role in roles {
                    if visited.insert(role.clone()) {
                        chain.push(role.clone());
                        queue.push_back(role.clone());
                    }
                }
            }
        }

        chain
    }

    /// Roles reachable from `subject`, direct ones first
    pub fn roles_for(&self, subject: &str) -> Vec<String> {
        self.subject_chain(subject).into_iter().skip(1).collect()
    }

    /// Direct grants plus grants inherited through roles, sorted
    pub fn implicit_permissions(&self, subject: &str) -> Vec<PolicyGrant> {
        let mut permissions: Vec<PolicyGrant> = self
            .subject_chain(subject)
            .into_iter()
            .flat_map(|s| {
                self.grants
                    .get(&s)
                    .into_iter()
                    .flatten()
                    .map(move |(object, action)| PolicyGrant::new(s.clone(), object, action))
                    .collect::<Vec<_>>()
            })
            .collect();
        permissions.sort();
        permissions
    }

    pub fn insert_grant(&mut self, grant: &PolicyGrant) {
        self.grants
            .entry(grant.subject.clone())
            .or_default()
            .insert((grant.object.clone(), grant.action.clone()));
    }

    pub fn remove_grant(&mut self, grant: &PolicyGrant) {
        if let Some(set) = self.grants.get_mut(&grant.subject) {
            set.remove(&(grant.object.clone(), grant.action.clone()));
            if set.is_empty() {
                self.grants.remove(&grant.subject);
            }
        }
    }

    pub fn insert_grouping(&mut self, grouping: &GroupingGrant) {
        self.groupings
            .entry(grouping.subject.clone())
            .or_default()
            .insert(grouping.role.clone());
    }

    pub fn remove_grouping(&mut self, grouping: &GroupingGrant) {
        if let Some(roles) = self.groupings.get_mut(&grouping.subject) {
            roles.remove(&grouping.role);
            if roles.is_empty() {
                self.groupings.remove(&grouping.subject);
            }
        }
    }

    /// Drop everything the subject holds directly (grants and groupings)
    pub fn remove_subject(&mut self, subject: &str) {
        self.grants.remove(subject);
        self.groupings.remove(subject);
    }

    /// Drop the grants attached to a role
    pub fn remove_subject_grants(&mut self, subject: &str) {
        self.grants.remove(subject);
    }

    pub fn remove_groupings(&mut self, subject: &str) {
        self.groupings.remove(subject);
    }

    pub fn grant_count(&self) -> usize {
        self.grants.values().map(HashSet::len).sum()
    }
}
