//! Response aggregation: a pure function over already-persisted rows.

use serde::Serialize;

use newslens_common::{Claim, Document, Perspective};

/// Most claims a response carries, flattened across all documents.
pub const CLAIM_PAYLOAD_CAP: usize = 20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerspectiveGroups {
    pub support: Vec<Document>,
    pub oppose: Vec<Document>,
    pub neutral: Vec<Document>,
}

impl PerspectiveGroups {
    pub fn total(&self) -> usize {
        self.support.len() + self.oppose.len() + self.neutral.len()
    }
}

/// Share of each group in whole percents. Each value is rounded
/// independently, so the three do not always sum to exactly 100 — e.g. a
/// three-way tie yields 33/33/33. Consumers tolerate the drift; do not
/// renormalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub support_pct: u32,
    pub oppose_pct: u32,
    pub neutral_pct: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    pub groups: PerspectiveGroups,
    pub distribution: Distribution,
    pub claims: Vec<Claim>,
}

fn pct(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * part as f64 / total as f64).round() as u32
}

/// Partition documents by perspective and cap the claims payload,
/// most recent first.
pub fn aggregate(documents: Vec<Document>, mut claims: Vec<Claim>) -> Aggregate {
    let total = documents.len();
    let mut groups = PerspectiveGroups::default();

    for doc in documents {
        match doc.perspective {
            Perspective::Support => groups.support.push(doc),
            Perspective::Oppose => groups.oppose.push(doc),
            Perspective::Neutral => groups.neutral.push(doc),
        }
    }

    let distribution = Distribution {
        support_pct: pct(groups.support.len(), total),
        oppose_pct: pct(groups.oppose.len(), total),
        neutral_pct: pct(groups.neutral.len(), total),
    };

    claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    claims.truncate(CLAIM_PAYLOAD_CAP);

    Aggregate {
        groups,
        distribution,
        claims,
    }
}
