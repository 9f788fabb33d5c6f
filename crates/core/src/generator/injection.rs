//! Rule-driven "this tile set must appear around here" requests.

use crate::catalog::InjectionRule;
use crate::graph::InjectedTile;
use crate::random::RandomStream;
use crate::types::{KeyId, TileSetId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InjectionRequest {
    pub tile_set: TileSetId,
    pub on_main_path: bool,
    /// Normalized main-path depth at which the request becomes due.
    pub path_depth: f32,
    /// Normalized branch depth at which a branch request becomes due.
    pub branch_depth: f32,
    pub required: bool,
    pub locked: bool,
    pub lock_key: Option<KeyId>,
}

impl InjectionRequest {
    pub fn should_inject(&self, on_main_path: bool, path_depth: f32, branch_depth: f32) -> bool {
        self.on_main_path == on_main_path
            && path_depth >= self.path_depth
            && (on_main_path || branch_depth >= self.branch_depth)
    }

    pub fn marker(&self) -> InjectedTile {
        InjectedTile { required: self.required, locked: self.locked, lock_key: self.lock_key }
    }
}

/// Draws one request per applicable rule, in rule order.
pub(super) fn gather_injections<'a>(
    rules: impl IntoIterator<Item = &'a InjectionRule>,
    random: &mut RandomStream,
) -> Vec<InjectionRequest> {
    let mut requests = Vec::new();
    for rule in rules {
        let on_main_path = match (rule.can_appear_on_main_path, rule.can_appear_on_branch_path) {
            (true, true) => random.next_double() < 0.5,
            (true, false) => true,
            (false, true) => false,
            (false, false) => continue,
        };
        requests.push(InjectionRequest {
            tile_set: rule.tile_set,
            on_main_path,
            path_depth: rule.path_depth.random(random),
            branch_depth: rule.branch_depth.random(random),
            required: rule.required,
            locked: rule.locked,
            lock_key: rule.lock_key,
        });
    }
    requests
}

/// Index of the first pending request due at this position.
pub(super) fn due_request(
    pending: &[InjectionRequest],
    on_main_path: bool,
    path_depth: f32,
    branch_depth: f32,
) -> Option<usize> {
    pending.iter().position(|request| request.should_inject(on_main_path, path_depth, branch_depth))
}
