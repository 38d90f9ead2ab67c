//! The CDCL retry driver (spec.md §4.F): runs `varisat::Solver` to a fixed
//! point over the encoded problem, resolving UNSAT results by dropping the
//! most-recently-failed assumption, and synthesizes jobs from the final
//! per-chain assignment.

use crate::encoder::{Encoding, VarFlags, encode, lit_for};
use depsolve_core::{Context, Error, EventSink, Result};
use depsolve_request::RequestEntry;
use depsolve_scheduler::Job;
use depsolve_universe::{ItemId, PackageType, Universe};
use tracing::{debug, warn};
use varisat::{Lit, Solver};

/// Run the SAT retry loop to completion and synthesize the resulting job
/// list (spec.md §4.F). `entries` is the resolved request; `universe` must
/// already contain every candidate the encoder will reference.
pub fn solve(universe: &Universe, entries: &[RequestEntry], ctx: &Context, sink: &dyn EventSink) -> Result<Vec<Job>> {
    let Encoding {
        formula,
        assumptions: _,
        mut flags,
    } = encode(universe, entries, ctx)?;

    let mut attempt: u32 = 0;
    let hard_cap = ctx.sat_retry_limit.saturating_mul(2).max(1);

    loop {
        let assumptions = current_assumptions(&flags);

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        solver.assume(&assumptions);

        let sat = solver
            .solve()
            .map_err(|e| Error::SolverInternal(e.to_string()))?;

        if sat {
            let model = solver.model().ok_or_else(|| {
                Error::SolverInternal("SAT result with no model".to_string())
            })?;
            apply_model(&model, &mut flags);

            if let Some(regressed) = check_install_regression(&flags) {
                for idx in regressed {
                    flags[idx].failed = true;
                }
                attempt += 1;
                if attempt > hard_cap {
                    return Err(Error::SatUnsat { attempts: attempt });
                }
                debug!(attempt, "install regression detected, re-solving");
                continue;
            }

            validate_single_install_per_chain(universe, &flags)?;
            return synthesize_jobs(universe, &flags);
        }

        let failed_core: Vec<Lit> = solver.failed_core().map(<[Lit]>::to_vec).unwrap_or_default();
        let Some(&culprit) = failed_core.last() else {
            return Err(Error::SatUnsat { attempts: attempt });
        };

        attempt += 1;
        let idx = var_index(culprit);

        if attempt >= ctx.sat_retry_limit {
            let uid = universe
                .item(ItemId::from_raw(u32::try_from(idx).expect("var index fits u32")))
                .pkg
                .uid
                .to_string();
            if sink.query_yes_no(&format!("drop {uid} from the request to continue resolving?")) {
                flags[idx].failed = true;
            } else {
                return Err(Error::SatUnsat { attempts: attempt });
            }
        } else {
            flags[idx].failed = true;
        }

        if attempt > hard_cap {
            warn!(attempt, "exceeding sat retry hard cap, giving up");
            return Err(Error::SatUnsat { attempts: attempt });
        }
    }
}

/// Rebuild the top-level assumption vector from current flag state,
/// flipping sign on anything marked `Failed` (spec.md §4.F: "re-assume
/// top-level literals respecting Failed flips").
fn current_assumptions(flags: &[VarFlags]) -> Vec<Lit> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, f)| f.assumed)
        .map(|(idx, f)| {
            let positive = f.assumed_true ^ f.failed;
            lit_for(ItemId::from_raw(u32::try_from(idx).expect("var index fits u32")), positive)
        })
        .collect()
}

fn apply_model(model: &[Lit], flags: &mut [VarFlags]) {
    for &lit in model {
        let idx = var_index(lit);
        if idx < flags.len() {
            flags[idx].install = is_positive(lit);
        }
    }
}

/// 0-based variable index from a DIMACS literal, mirroring `lit_for`'s
/// 1-based encoding. Goes through `to_dimacs`/`from_dimacs` rather than any
/// `varisat::Lit` accessor this workspace isn't confident is stable API.
fn var_index(lit: Lit) -> usize {
    usize::try_from(lit.to_dimacs().unsigned_abs()).expect("dimacs var fits usize") - 1
}

fn is_positive(lit: Lit) -> bool {
    lit.to_dimacs() > 0
}

/// A top-level install/upgrade request whose variable ended up false means
/// the solver chose to remove any local install without picking a
/// replacement — not what the user asked for. Flagging it `Failed` and
/// re-solving lets the clause set find an alternative (spec.md §4.F).
fn check_install_regression(flags: &[VarFlags]) -> Option<Vec<usize>> {
    let bad: Vec<usize> = flags
        .iter()
        .enumerate()
        .filter(|(_, f)| f.top && f.assumed_true && !f.failed && !f.install)
        .map(|(idx, _)| idx)
        .collect();
    if bad.is_empty() { None } else { Some(bad) }
}

fn validate_single_install_per_chain(universe: &Universe, flags: &[VarFlags]) -> Result<()> {
    for (uid, chain) in universe.chains() {
        let installed = chain.iter().filter(|&&id| flags[id.index() as usize].install).count();
        if installed > 1 {
            return Err(Error::SolverInternal(format!(
                "more than one candidate selected for install in uid {uid}"
            )));
        }
    }
    Ok(())
}

/// Per-chain job synthesis from the final assignment (spec.md §4.F).
fn synthesize_jobs(universe: &Universe, flags: &[VarFlags]) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();

    for (uid, chain) in universe.chains() {
        let mut add: Vec<ItemId> = Vec::new();
        let mut del: Vec<ItemId> = Vec::new();

        for &id in chain {
            let item = universe.item(id);
            let install = flags[id.index() as usize].install;
            if item.pkg.kind == PackageType::Installed {
                if !install {
                    del.push(id);
                }
            } else if install {
                add.push(id);
            }
        }

        if add.len() > 1 {
            return Err(Error::AmbiguousInstall { uid: uid.to_string() });
        }

        match (add.first().copied(), del.as_slice()) {
            (Some(a), []) => jobs.push(Job::install(a)),
            (Some(a), [d]) => jobs.push(Job::upgrade(a, *d)),
            (None, []) => {}
            (None, dels) => jobs.extend(dels.iter().copied().map(Job::delete)),
            (Some(_), _) => {
                return Err(Error::SolverInternal(format!(
                    "uid {uid} has an install candidate alongside more than one removal"
                )));
            }
        }
    }

    Ok(jobs)
}
