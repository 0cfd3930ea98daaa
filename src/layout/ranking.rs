use std::cmp::Reverse;
use std::collections::HashMap;

use crate::error::PlotWarning;

/// Group assigned to each secondary category, first observed named group wins.
#[derive(Debug, Clone, Default)]
pub struct GroupAssignment {
    first: HashMap<String, Option<String>>,
}

impl GroupAssignment {
    /// Resolves one group per secondary value from `(secondary, group)` pairs in
    /// table order. Missing groups are skipped when a named one exists.
    /// Secondary values seen with several named groups produce one
    /// `MultipleGroups` warning each, in first-seen order.
    pub fn resolve<'a, I>(pairs: I, warnings: &mut Vec<PlotWarning>) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut order: Vec<&str> = Vec::new();
        let mut seen: HashMap<&str, Vec<Option<&str>>> = HashMap::new();
        for (secondary, group) in pairs {
            let groups = seen.entry(secondary).or_insert_with(|| {
                order.push(secondary);
                Vec::new()
            });
            if !groups.contains(&group) {
                groups.push(group);
            }
        }

        let mut first = HashMap::new();
        for secondary in order {
            let groups = &seen[secondary];
            let named: Vec<String> = groups.iter().flatten().map(|g| g.to_string()).collect();
            if named.len() > 1 {
                PlotWarning::MultipleGroups {
                    secondary: secondary.to_string(),
                    groups: named,
                }
                .emit(warnings);
            }
            first.insert(
                secondary.to_string(),
                groups.iter().flatten().next().map(|g| g.to_string()),
            );
        }
        Self { first }
    }

    pub fn group_of(&self, secondary: &str) -> Option<&str> {
        self.first.get(secondary).and_then(|g| g.as_deref())
    }
}

/// Canonical group ranking, declared order first.
#[derive(Debug, Clone, Default)]
pub struct GroupRanking {
    declared: Vec<String>,
}

impl GroupRanking {
    pub fn new(declared: Vec<String>) -> Self {
        Self { declared }
    }

    /// Sort rank used for secondary ordering: the ranking is reversed so the
    /// last declared group sorts first. Unknown or missing groups rank last.
    pub fn reversed_rank(&self, group: Option<&str>) -> usize {
        group
            .and_then(|g| self.declared.iter().rev().position(|d| d == g))
            .unwrap_or(self.declared.len())
    }

    pub fn contains(&self, group: &str) -> bool {
        self.declared.iter().any(|d| d == group)
    }
}

/// Orders secondary categories by (reversed group rank, descending count,
/// ascending label).
pub fn order_secondary<'a, I>(
    secondaries: I,
    groups: &GroupAssignment,
    ranking: &GroupRanking,
) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for secondary in secondaries {
        *counts.entry(secondary).or_default() += 1;
    }
    let mut keyed: Vec<(usize, Reverse<usize>, &str)> = counts
        .into_iter()
        .map(|(label, count)| {
            (
                ranking.reversed_rank(groups.group_of(label)),
                Reverse(count),
                label,
            )
        })
        .collect();
    keyed.sort();
    keyed
        .into_iter()
        .map(|(_, _, label)| label.to_string())
        .collect()
}
