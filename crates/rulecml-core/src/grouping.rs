//! Rule clustering by shared product references.
//!
//! Rules touching a common product id end up in one group (union-find over
//! rules); groups touching a common root-level product end up in one cluster.
//! Each cluster is compiled into its own CML artifact.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::catalog::RootProduct;
use crate::rules::Rule;

/// Prefix shared by all catalog product ids.
pub const PRODUCT_ID_PREFIX: &str = "01t";

/// Returns `true` if `value` has the shape of a catalog product id.
#[must_use]
pub fn is_product_id(value: &str) -> bool {
    value.starts_with(PRODUCT_ID_PREFIX)
}

/// Returns `true` if two ids refer to the same record.
///
/// Ids appear in both a short and a long form, so one being a prefix of the
/// other counts as a match. Empty ids never match.
#[must_use]
pub fn ids_refer(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
}

/// Collects every product id a rule references, in first-seen order.
#[must_use]
pub fn extract_product_ids(rule: &Rule) -> IndexSet<String> {
    let mut ids = IndexSet::new();

    for criterion in &rule.criteria {
        ids.extend(criterion.root_object_id.iter().cloned());
        ids.extend(criterion.source_values.iter().cloned());
        for info in criterion.source_information.iter().filter(|i| i.is_product()) {
            ids.extend(info.values.iter().cloned());
        }
    }
    for action in &rule.actions {
        ids.extend(action.target_values.iter().cloned());
        for info in action.target_information.iter().filter(|i| i.is_product()) {
            ids.extend(info.values.iter().cloned());
        }
    }

    ids.retain(|id| is_product_id(id));
    ids
}

/// Rules connected through shared product ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    /// Member product ids joined with `,`; stable for the same member rules.
    pub key: String,
    /// Product ids referenced by the member rules, in first-seen order.
    pub product_ids: IndexSet<String>,
    /// Member rules in input order.
    pub rules: Vec<Rule>,
}

/// Root-level products together with every rule that applies to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Root products in first-matched order.
    pub roots: Vec<RootProduct>,
    /// Rules in ascending sequence order.
    pub rules: Vec<Rule>,
}

/// Union-find over rule indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // The smaller index stays root so components keep input order.
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

/// Partitions rules into groups that share no product id.
///
/// Every rule lands in exactly one group; two rules referencing a common
/// product id always share a group.
#[must_use]
pub fn group_by_non_intersecting_rules(rules: &[Rule]) -> Vec<RuleGroup> {
    let ids: Vec<IndexSet<String>> = rules.iter().map(extract_product_ids).collect();
    let mut sets = DisjointSet::new(rules.len());
    let mut first_owner: IndexMap<&str, usize> = IndexMap::new();

    for (index, rule_ids) in ids.iter().enumerate() {
        for id in rule_ids {
            match first_owner.get(id.as_str()) {
                Some(&owner) => sets.union(owner, index),
                None => {
                    first_owner.insert(id.as_str(), index);
                }
            }
        }
    }

    let mut groups: IndexMap<usize, RuleGroup> = IndexMap::new();
    for (index, rule) in rules.iter().enumerate() {
        let root = sets.find(index);
        let group = groups.entry(root).or_insert_with(|| RuleGroup {
            key: String::new(),
            product_ids: IndexSet::new(),
            rules: Vec::new(),
        });
        group.product_ids.extend(ids[index].iter().cloned());
        group.rules.push(rule.clone());
    }

    let groups: Vec<RuleGroup> = groups
        .into_values()
        .map(|mut g| {
            g.key = g
                .product_ids
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",");
            g
        })
        .collect();

    debug!(
        "Grouped {} rule(s) into {} non-intersecting group(s)",
        rules.len(),
        groups.len()
    );
    groups
}

/// Merges rule groups by the root-level products they touch.
///
/// Returns the clusters and the groups that matched no root product.
#[must_use]
pub fn cluster_by_root_products(
    groups: Vec<RuleGroup>,
    roots: &IndexMap<String, RootProduct>,
) -> (Vec<Cluster>, Vec<RuleGroup>) {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut unmatched = Vec::new();

    for group in groups {
        let matched: Vec<&RootProduct> = roots
            .values()
            .filter(|root| group.product_ids.iter().any(|id| root.refers_to(id)))
            .collect();
        if matched.is_empty() {
            unmatched.push(group);
            continue;
        }

        let overlapping: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.roots
                    .iter()
                    .any(|r| matched.iter().any(|m| m.product.id == r.product.id))
            })
            .map(|(i, _)| i)
            .collect();

        let target = if let Some(&first) = overlapping.first() {
            // Later overlapping clusters fold into the first one.
            for &i in overlapping.iter().skip(1).rev() {
                let absorbed = clusters.remove(i);
                merge_into(&mut clusters[first], absorbed.roots.iter(), absorbed.rules);
            }
            first
        } else {
            clusters.push(Cluster {
                roots: Vec::new(),
                rules: Vec::new(),
            });
            clusters.len() - 1
        };
        merge_into(&mut clusters[target], matched.into_iter(), group.rules);
    }

    for cluster in &mut clusters {
        crate::rules::sort_by_sequence(&mut cluster.rules);
    }

    (clusters, unmatched)
}

fn merge_into<'a>(
    cluster: &mut Cluster,
    roots: impl Iterator<Item = &'a RootProduct>,
    rules: Vec<Rule>,
) {
    for root in roots {
        if !cluster
            .roots
            .iter()
            .any(|r| r.product.id == root.product.id)
        {
            cluster.roots.push(root.clone());
        }
    }
    cluster.rules.extend(rules);
}
