//! Validated, index-resolved view of a flow and tile library.
//!
//! Every name in the design data is resolved once here, so the generator only
//! ever deals with typed ids and can never hit a dangling reference mid-run.

use std::collections::{BTreeMap, BTreeSet};
use std::slice;

use crate::error::FlowError;
use crate::flow::{
    ArchetypeSpec, BranchCapMode, DungeonFlow, LockSpec, NodeLockPlacement, RuleChain,
    TileInjectionRule, TileSetSpec,
};
use crate::geometry::Axis;
use crate::library::TileLibrary;
use crate::template::TileTemplate;
use crate::types::{ArchetypeId, FloatRange, IntRange, KeyId, NodeId, PrefabId, TileSetId};
use crate::weighted::{Weighted, WeightedTable};

const COVERAGE_EPSILON: f32 = 1e-4;

#[derive(Clone, Debug, PartialEq)]
pub struct LockPrefabs {
    pub socket: Option<String>,
    pub prefabs: WeightedTable<PrefabId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TileSet {
    pub name: String,
    pub tiles: WeightedTable<PrefabId>,
    pub lock_prefabs: Vec<LockPrefabs>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Archetype {
    pub name: String,
    pub tile_sets: Vec<TileSetId>,
    pub branch_start_tile_sets: Vec<TileSetId>,
    pub branch_start_mode: BranchCapMode,
    pub branch_cap_tile_sets: Vec<TileSetId>,
    pub branch_cap_mode: BranchCapMode,
    pub branch_count: IntRange,
    pub branching_depth: IntRange,
    pub straighten_chance: f32,
    pub unique: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lock {
    pub key: KeyId,
    pub count: IntRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    pub position: f32,
    pub length: f32,
    pub archetypes: Vec<ArchetypeId>,
    pub keys: Vec<KeyId>,
    pub locks: Vec<Lock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub label: String,
    pub position: f32,
    pub tile_sets: Vec<TileSetId>,
    pub lock_placement: NodeLockPlacement,
    pub keys: Vec<KeyId>,
    pub locks: Vec<Lock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InjectionRule {
    pub tile_set: TileSetId,
    pub path_depth: FloatRange,
    pub branch_depth: FloatRange,
    pub can_appear_on_main_path: bool,
    pub can_appear_on_branch_path: bool,
    pub required: bool,
    pub locked: bool,
    pub lock_key: Option<KeyId>,
}

#[derive(Debug)]
pub struct Catalog {
    flow: DungeonFlow,
    templates: Vec<TileTemplate>,
    owning_tile_set: Vec<Option<TileSetId>>,
    tile_sets: Vec<TileSet>,
    archetypes: Vec<Archetype>,
    lines: Vec<Line>,
    nodes: Vec<Node>,
    injection_rules: Vec<InjectionRule>,
    rules: RuleChain,
}

impl Catalog {
    pub fn new(flow: &DungeonFlow, library: &TileLibrary, up: Axis) -> Result<Self, FlowError> {
        let resolver = Resolver::new(flow, library)?;

        let templates: Vec<TileTemplate> = library
            .prefabs
            .iter()
            .enumerate()
            .map(|(index, prefab)| {
                TileTemplate::from_prefab(PrefabId::from_index(index), prefab, up)
            })
            .collect();

        let tile_sets = flow
            .tile_sets
            .iter()
            .map(|set| resolver.tile_set(set))
            .collect::<Result<Vec<_>, _>>()?;

        let mut owning_tile_set = vec![None; templates.len()];
        for (index, set) in tile_sets.iter().enumerate() {
            for entry in set.tiles.entries() {
                let owner = &mut owning_tile_set[entry.value.index()];
                if owner.is_none() {
                    *owner = Some(TileSetId::from_index(index));
                }
            }
        }

        let archetypes = flow
            .archetypes
            .iter()
            .map(|archetype| resolver.archetype(archetype))
            .collect::<Result<Vec<_>, _>>()?;

        let lines = resolver.lines()?;
        let nodes = resolver.nodes()?;
        let injection_rules = flow
            .injection_rules
            .iter()
            .map(|rule| resolver.injection_rule(rule))
            .collect::<Result<Vec<_>, _>>()?;

        check_range("length", flow.length, 1)?;
        if !flow.branch_count.is_valid() || flow.branch_count.min < 0 {
            return Err(invalid_int_range("global branch count", flow.branch_count));
        }
        for key in &flow.keys.keys {
            check_range(&format!("keys per lock of `{}`", key.name), key.keys_per_lock, 0)?;
        }

        log::debug!(
            "catalog ready: {} templates, {} tile sets, {} archetypes, {} lines, {} nodes",
            templates.len(),
            tile_sets.len(),
            archetypes.len(),
            lines.len(),
            nodes.len()
        );

        Ok(Self {
            flow: flow.clone(),
            templates,
            owning_tile_set,
            tile_sets,
            archetypes,
            lines,
            nodes,
            injection_rules,
            rules: RuleChain::from_specs(&flow.connection_rules),
        })
    }

    pub fn flow(&self) -> &DungeonFlow {
        &self.flow
    }

    pub fn template(&self, id: PrefabId) -> Option<&TileTemplate> {
        self.templates.get(id.index())
    }

    pub fn templates(&self) -> &[TileTemplate] {
        &self.templates
    }

    /// The first tile set that lists this prefab.
    pub fn owning_tile_set(&self, id: PrefabId) -> Option<TileSetId> {
        self.owning_tile_set.get(id.index()).copied().flatten()
    }

    pub fn tile_set(&self, id: TileSetId) -> &TileSet {
        &self.tile_sets[id.index()]
    }

    pub fn archetype(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id.index()]
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn line(&self, index: usize) -> &Line {
        &self.lines[index]
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Nodes ordered by position along the main path.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn injection_rules(&self) -> &[InjectionRule] {
        &self.injection_rules
    }

    pub fn rules(&self) -> &RuleChain {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleChain {
        &mut self.rules
    }

    /// Resolves a runtime injection rule against this catalog.
    pub fn resolve_injection(&self, rule: &TileInjectionRule) -> Result<InjectionRule, FlowError> {
        let names: BTreeMap<&str, usize> = self
            .tile_sets
            .iter()
            .enumerate()
            .map(|(index, set)| (set.name.as_str(), index))
            .collect();
        resolve_injection_rule(rule, &names, &self.flow)
    }

    /// Merges tile sets into one table, keeping every entry's own weights.
    pub fn merged_table(&self, tile_sets: &[TileSetId]) -> WeightedTable<PrefabId> {
        let mut table = WeightedTable::default();
        for id in tile_sets {
            table.extend(self.tile_set(*id).tiles.entries().iter().cloned());
        }
        table
    }
}

struct Resolver<'a> {
    flow: &'a DungeonFlow,
    library: &'a TileLibrary,
    tile_set_names: BTreeMap<&'a str, usize>,
}

impl<'a> Resolver<'a> {
    fn new(flow: &'a DungeonFlow, library: &'a TileLibrary) -> Result<Self, FlowError> {
        let mut prefab_names = BTreeSet::new();
        for prefab in &library.prefabs {
            if !prefab_names.insert(prefab.name.as_str()) {
                return Err(FlowError::DuplicateName { kind: "prefab", name: prefab.name.clone() });
            }
            if prefab.doorways.is_empty() {
                return Err(FlowError::PrefabWithoutDoorways(prefab.name.clone()));
            }
            for (role, designation) in [("entrance", prefab.entrance), ("exit", prefab.exit)] {
                if let Some(index) = designation
                    && index >= prefab.doorways.len()
                {
                    return Err(FlowError::InvalidDoorwayDesignation {
                        prefab: prefab.name.clone(),
                        role,
                        index,
                        count: prefab.doorways.len(),
                    });
                }
            }
        }

        let mut tile_set_names = BTreeMap::new();
        for (index, set) in flow.tile_sets.iter().enumerate() {
            if tile_set_names.insert(set.name.as_str(), index).is_some() {
                return Err(FlowError::DuplicateName { kind: "tile set", name: set.name.clone() });
            }
        }

        let mut archetype_names = BTreeSet::new();
        for archetype in &flow.archetypes {
            if !archetype_names.insert(archetype.name.as_str()) {
                return Err(FlowError::DuplicateName {
                    kind: "archetype",
                    name: archetype.name.clone(),
                });
            }
        }

        let mut key_names = BTreeSet::new();
        for key in &flow.keys.keys {
            if !key_names.insert(key.name.as_str()) {
                return Err(FlowError::DuplicateName { kind: "key", name: key.name.clone() });
            }
        }

        Ok(Self { flow, library, tile_set_names })
    }

    fn prefab(&self, tile_set: &str, name: &str) -> Result<PrefabId, FlowError> {
        self.library.find(name).map(PrefabId::from_index).ok_or_else(|| FlowError::UnknownPrefab {
            tile_set: tile_set.to_string(),
            name: name.to_string(),
        })
    }

    fn prefab_table(
        &self,
        tile_set: &str,
        entries: &[Weighted<String>],
    ) -> Result<WeightedTable<PrefabId>, FlowError> {
        let entries = entries
            .iter()
            .map(|entry| {
                Ok(Weighted {
                    value: self.prefab(tile_set, &entry.value)?,
                    main_path_weight: entry.main_path_weight,
                    branch_path_weight: entry.branch_path_weight,
                    depth_curve: entry.depth_curve.clone(),
                })
            })
            .collect::<Result<Vec<_>, FlowError>>()?;
        Ok(WeightedTable::new(entries))
    }

    fn tile_set(&self, set: &TileSetSpec) -> Result<TileSet, FlowError> {
        if set.tiles.is_empty() {
            return Err(FlowError::EmptyTileSet(set.name.clone()));
        }
        let lock_prefabs = set
            .lock_prefabs
            .iter()
            .map(|lock| {
                Ok(LockPrefabs {
                    socket: lock.socket.clone(),
                    prefabs: self.prefab_table(&set.name, lock.prefabs.entries())?,
                })
            })
            .collect::<Result<Vec<_>, FlowError>>()?;
        Ok(TileSet {
            name: set.name.clone(),
            tiles: self.prefab_table(&set.name, &set.tiles)?,
            lock_prefabs,
        })
    }

    fn tile_set_ids(&self, owner: &str, names: &[String]) -> Result<Vec<TileSetId>, FlowError> {
        resolve_tile_sets(owner, names, &self.tile_set_names)
    }

    fn archetype(&self, spec: &ArchetypeSpec) -> Result<Archetype, FlowError> {
        if spec.tile_sets.is_empty() {
            return Err(FlowError::ArchetypeWithoutTileSets(spec.name.clone()));
        }
        let owner = format!("archetype `{}`", spec.name);
        check_range(&format!("branch count of `{}`", spec.name), spec.branch_count, 0)?;
        check_range(&format!("branching depth of `{}`", spec.name), spec.branching_depth, 0)?;
        if !(0.0..=1.0).contains(&spec.straighten_chance) {
            return Err(FlowError::InvalidRange {
                what: format!("straighten chance of `{}`", spec.name),
                min: spec.straighten_chance,
                max: spec.straighten_chance,
            });
        }
        Ok(Archetype {
            name: spec.name.clone(),
            tile_sets: self.tile_set_ids(&owner, &spec.tile_sets)?,
            branch_start_tile_sets: self.tile_set_ids(&owner, &spec.branch_start_tile_sets)?,
            branch_start_mode: spec.branch_start_mode,
            branch_cap_tile_sets: self.tile_set_ids(&owner, &spec.branch_cap_tile_sets)?,
            branch_cap_mode: spec.branch_cap_mode,
            branch_count: spec.branch_count,
            branching_depth: spec.branching_depth,
            straighten_chance: spec.straighten_chance,
            unique: spec.unique,
        })
    }

    fn keys(&self, owner: &str, names: &[String]) -> Result<Vec<KeyId>, FlowError> {
        names.iter().map(|name| resolve_key(owner, name, self.flow)).collect()
    }

    fn locks(&self, owner: &str, specs: &[LockSpec]) -> Result<Vec<Lock>, FlowError> {
        specs
            .iter()
            .map(|lock| {
                check_range(&format!("lock count of {owner}"), lock.count, 0)?;
                Ok(Lock { key: resolve_key(owner, &lock.key, self.flow)?, count: lock.count })
            })
            .collect()
    }

    fn lines(&self) -> Result<Vec<Line>, FlowError> {
        if self.flow.lines.is_empty() {
            return Err(FlowError::NoLines);
        }
        let mut expected_start = 0.0_f32;
        let mut lines = Vec::with_capacity(self.flow.lines.len());
        for (index, line) in self.flow.lines.iter().enumerate() {
            if line.archetypes.is_empty() {
                return Err(FlowError::LineWithoutArchetypes(index));
            }
            if line.length <= 0.0 || (line.position - expected_start).abs() > COVERAGE_EPSILON {
                return Err(FlowError::LinesDoNotCover(index));
            }
            expected_start = line.position + line.length;

            let archetypes = line
                .archetypes
                .iter()
                .map(|name| {
                    self.flow
                        .archetypes
                        .iter()
                        .position(|archetype| &archetype.name == name)
                        .map(ArchetypeId::from_index)
                        .ok_or_else(|| FlowError::UnknownArchetype {
                            line: index,
                            name: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let owner = format!("line {index}");
            lines.push(Line {
                position: line.position,
                length: line.length,
                archetypes,
                keys: self.keys(&owner, &line.keys)?,
                locks: self.locks(&owner, &line.locks)?,
            });
        }
        if (expected_start - 1.0).abs() > COVERAGE_EPSILON {
            return Err(FlowError::LinesDoNotCover(self.flow.lines.len() - 1));
        }
        Ok(lines)
    }

    fn nodes(&self) -> Result<Vec<Node>, FlowError> {
        let mut nodes = Vec::with_capacity(self.flow.nodes.len());
        for node in &self.flow.nodes {
            if !(0.0..=1.0).contains(&node.position) {
                return Err(FlowError::NodeOutOfRange {
                    label: node.label.clone(),
                    position: node.position,
                });
            }
            if node.tile_sets.is_empty() {
                return Err(FlowError::NodeWithoutTileSets(node.label.clone()));
            }
            let owner = format!("node `{}`", node.label);
            nodes.push(Node {
                label: node.label.clone(),
                position: node.position,
                tile_sets: self.tile_set_ids(&owner, &node.tile_sets)?,
                lock_placement: node.lock_placement,
                keys: self.keys(&owner, &node.keys)?,
                locks: self.locks(&owner, &node.locks)?,
            });
        }
        nodes.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(nodes)
    }

    fn injection_rule(&self, rule: &TileInjectionRule) -> Result<InjectionRule, FlowError> {
        resolve_injection_rule(rule, &self.tile_set_names, self.flow)
    }
}

fn resolve_tile_sets(
    owner: &str,
    names: &[String],
    tile_set_names: &BTreeMap<&str, usize>,
) -> Result<Vec<TileSetId>, FlowError> {
    names
        .iter()
        .map(|name| {
            tile_set_names.get(name.as_str()).map(|&index| TileSetId::from_index(index)).ok_or_else(
                || FlowError::UnknownTileSet { owner: owner.to_string(), name: name.clone() },
            )
        })
        .collect()
}

fn resolve_key(owner: &str, name: &str, flow: &DungeonFlow) -> Result<KeyId, FlowError> {
    flow.keys
        .find(name)
        .ok_or_else(|| FlowError::UnknownKey { owner: owner.to_string(), name: name.to_string() })
}

fn resolve_injection_rule(
    rule: &TileInjectionRule,
    tile_set_names: &BTreeMap<&str, usize>,
    flow: &DungeonFlow,
) -> Result<InjectionRule, FlowError> {
    let owner = format!("injection rule for `{}`", rule.tile_set);
    let tile_set =
        resolve_tile_sets(&owner, slice::from_ref(&rule.tile_set), tile_set_names)?[0];
    for (what, range) in [("path depth", rule.path_depth), ("branch depth", rule.branch_depth)] {
        if !range.is_valid() {
            return Err(FlowError::InvalidRange {
                what: format!("{what} of {owner}"),
                min: range.min,
                max: range.max,
            });
        }
    }
    let lock_key =
        rule.lock_key.as_deref().map(|name| resolve_key(&owner, name, flow)).transpose()?;
    Ok(InjectionRule {
        tile_set,
        path_depth: rule.path_depth,
        branch_depth: rule.branch_depth,
        can_appear_on_main_path: rule.can_appear_on_main_path,
        can_appear_on_branch_path: rule.can_appear_on_branch_path,
        required: rule.required,
        locked: rule.locked,
        lock_key,
    })
}

fn invalid_int_range(what: &str, range: IntRange) -> FlowError {
    FlowError::InvalidRange { what: what.to_string(), min: range.min as f32, max: range.max as f32 }
}

fn check_range(what: &str, range: IntRange, minimum: i32) -> Result<(), FlowError> {
    if range.is_valid() && range.min >= minimum {
        Ok(())
    } else {
        Err(invalid_int_range(what, range))
    }
}
