//! CNF construction over the universe: the six clause families of spec.md
//! §4.E, plus the phase-hint bookkeeping the solver's retry loop consults.

use depsolve_core::{Context, Error, Result};
use depsolve_request::{RequestEntry, RequestEntryKind};
use depsolve_universe::{ConflictKind, ItemId, Universe};
use tracing::debug;
use varisat::{CnfFormula, ExtendFormula, Lit};

/// Per-variable bookkeeping the spec calls `flags` (spec.md §4.E): `install`
/// and `failed` are read back after each solver attempt, `top`/`assumed`/
/// `assumed_true` mark which variables the top-level request pinned.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarFlags {
    pub install: bool,
    pub top: bool,
    pub failed: bool,
    pub assumed: bool,
    pub assumed_true: bool,
    /// The phase this item would be biased towards, per the rules below.
    /// Computed for diagnostics and the tie-break priority field only; not
    /// pushed into the solver as a polarity hint (see `DESIGN.md`).
    pub phase_hint: bool,
}

/// A built CNF instance plus the bookkeeping needed to drive and reinterpret
/// a `varisat::Solver` session over it.
pub struct Encoding {
    pub formula: CnfFormula,
    /// Top-level assumption literals, one per `RequestEntry`'s chain head
    /// (spec.md §4.E: "this gives the user intent maximum priority").
    pub assumptions: Vec<Lit>,
    /// Indexed by `ItemId::index()`.
    pub flags: Vec<VarFlags>,
}

/// Map a universe item onto its 1-based CNF variable, in the given polarity.
#[must_use]
pub fn lit_for(item: ItemId, positive: bool) -> Lit {
    let var = i32::try_from(item.index() + 1).expect("universe item count fits i32");
    Lit::from_dimacs(if positive { var } else { -var })
}

/// Build the full clause set for one solve attempt (spec.md §4.E).
pub fn encode(universe: &Universe, entries: &[RequestEntry], ctx: &Context) -> Result<Encoding> {
    let arena_len = universe.iter_items().count();
    let mut flags = vec![VarFlags::default(); arena_len];
    let mut formula = CnfFormula::new();
    let mut assumptions = Vec::new();

    encode_request(entries, &mut formula, &mut assumptions, &mut flags);
    encode_request_internal_conflict(entries, &mut formula);
    encode_chain_conflict(universe, &mut formula);
    encode_depend(universe, ctx, &mut formula)?;
    encode_explicit_conflict(universe, &mut formula);
    encode_require_provide(universe, &mut formula);

    compute_phase_hints(universe, &mut flags);

    Ok(Encoding {
        formula,
        assumptions,
        flags,
    })
}

/// Clause family 1 (PKG_RULE_REQUEST): one clause per entry over its
/// non-skipped items, plus a top-level assumption on the chain head.
fn encode_request(
    entries: &[RequestEntry],
    formula: &mut CnfFormula,
    assumptions: &mut Vec<Lit>,
    flags: &mut [VarFlags],
) {
    for entry in entries {
        let positive = entry.kind == RequestEntryKind::Add;
        let live: Vec<_> = entry.items.iter().filter(|item| !item.skip).collect();
        if live.is_empty() {
            continue;
        }

        let clause: Vec<Lit> = live.iter().map(|item| lit_for(item.item_id, positive)).collect();
        formula.add_clause(&clause);

        let head = live[0].item_id;
        let idx = head.index() as usize;
        flags[idx].top = true;
        flags[idx].assumed = true;
        flags[idx].assumed_true = positive;
        assumptions.push(lit_for(head, positive));
    }
}

/// Clause family 2 (PKG_RULE_REQUEST_CONFLICT): at most one surviving
/// candidate per entry may be installed.
fn encode_request_internal_conflict(entries: &[RequestEntry], formula: &mut CnfFormula) {
    for entry in entries {
        let live: Vec<_> = entry.items.iter().filter(|item| !item.skip).collect();
        for i in 0..live.len() {
            for j in (i + 1)..live.len() {
                formula.add_clause(&[lit_for(live[i].item_id, false), lit_for(live[j].item_id, false)]);
            }
        }
    }
}

/// Clause family 3 (PKG_RULE_UPGRADE_CONFLICT): at most one item per uid
/// chain may be installed.
fn encode_chain_conflict(universe: &Universe, formula: &mut CnfFormula) {
    for chain in universe.chains().values() {
        for i in 0..chain.len() {
            for j in (i + 1)..chain.len() {
                formula.add_clause(&[lit_for(chain[i], false), lit_for(chain[j], false)]);
            }
        }
    }
}

/// Clause family 4 (PKG_RULE_DEPEND): installing `A` requires installing one
/// candidate from each direct dependency's chain.
fn encode_depend(universe: &Universe, ctx: &Context, formula: &mut CnfFormula) -> Result<()> {
    for (item_id, item) in universe.iter_items() {
        for dep in &item.pkg.deps {
            let Some(chain) = universe.find(&dep.uid) else {
                if ctx.force_missing {
                    debug!(uid = %item.pkg.uid, dep = %dep.uid, "suppressing missing dependency clause");
                    continue;
                }
                return Err(Error::MissingDep {
                    uid: item.pkg.uid.to_string(),
                    dep: dep.uid.to_string(),
                });
            };

            let mut clause = vec![lit_for(item_id, false)];
            clause.extend(chain.iter().map(|&b| lit_for(b, true)));
            formula.add_clause(&clause);
        }
    }
    Ok(())
}

/// Clause family 5 (PKG_RULE_EXPLICIT_CONFLICT): declared conflicts between
/// compatible-typed candidates.
///
/// The original narrows this further by digest: two packages only truly
/// conflict if the specific archive content that triggered the
/// conflict-engine pairing is the one actually selected. `Package` doesn't
/// carry that per-pair digest association (conflicts are recorded as a uid
/// set, not a set of specific item pairs), so this clause applies to every
/// chain member of the conflicting uid rather than a digest-narrowed subset
/// — a conservative superset of the original rule (documented in
/// `DESIGN.md`).
fn encode_explicit_conflict(universe: &Universe, formula: &mut CnfFormula) {
    for (item_id, item) in universe.iter_items() {
        let conflicting_uids: Vec<_> = item.pkg.conflicts.lock().iter().cloned().collect();
        for other_uid in conflicting_uids {
            let Some(chain) = universe.find(&other_uid) else {
                continue;
            };
            let kind = item.pkg.conflict_kinds.lock().get(&other_uid).copied();
            for &other_id in chain {
                if other_id == item_id {
                    continue;
                }
                let other = universe.item(other_id);
                if !types_compatible(item.pkg.kind, other.pkg.kind, kind) {
                    continue;
                }
                formula.add_clause(&[lit_for(item_id, false), lit_for(other_id, false)]);
            }
        }
    }
}

fn types_compatible(
    a: depsolve_universe::PackageType,
    b: depsolve_universe::PackageType,
    kind: Option<ConflictKind>,
) -> bool {
    use depsolve_universe::PackageType::Installed;
    match kind {
        Some(ConflictKind::RemoteLocal) => (a == Installed) != (b == Installed),
        Some(ConflictKind::RemoteRemote) => a != Installed && b != Installed,
        None => true,
    }
}

/// Clause family 6 (PKG_RULE_REQUIRE): installing `A` requires a provider
/// for each unsatisfied `requires`/`shlibs_required` capability. A capability
/// with no provider in the universe is suppressed, not fatal — stale shlib
/// metadata is common (spec.md §4.E).
fn encode_require_provide(universe: &Universe, formula: &mut CnfFormula) {
    for (item_id, item) in universe.iter_items() {
        for cap in item.pkg.requires.iter().chain(item.pkg.shlibs_required.iter()) {
            let providers: Vec<ItemId> = universe
                .iter_items()
                .filter(|(pid, p)| {
                    *pid != item_id && (p.pkg.provides.contains(cap) || p.pkg.shlibs_provided.contains(cap))
                })
                .map(|(pid, _)| pid)
                .collect();

            if providers.is_empty() {
                debug!(uid = %item.pkg.uid, capability = %cap, "no provider found, suppressing require clause");
                continue;
            }

            let mut clause = vec![lit_for(item_id, false)];
            clause.extend(providers.into_iter().map(|p| lit_for(p, true)));
            formula.add_clause(&clause);
        }
    }
}

/// Phase-hint bookkeeping (spec.md §4.E): for every non-top variable, bias
/// towards keeping a locally-installed sibling and away from installing a
/// uid's sole remote candidate. Recorded on `VarFlags`/`UniverseItem`
/// priority for the scheduler's tie-break; never passed to `varisat` as a
/// literal polarity call (see `DESIGN.md`).
fn compute_phase_hints(universe: &Universe, flags: &mut [VarFlags]) {
    for chain in universe.chains().values() {
        let has_local = chain
            .iter()
            .any(|&id| universe.item(id).pkg.kind == depsolve_universe::PackageType::Installed);

        for &id in chain {
            let idx = id.index() as usize;
            if flags[idx].top {
                continue;
            }
            let item = universe.item(id);
            if flags[idx].failed {
                flags[idx].phase_hint = !flags[idx].phase_hint;
                continue;
            }
            if has_local {
                flags[idx].phase_hint = true;
                item.set_priority(item.priority() + 1);
            } else if chain.len() == 1 {
                flags[idx].phase_hint = false;
                item.set_priority(item.priority() - 1);
            }
        }
    }
}
