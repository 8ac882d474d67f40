//! Group reconciler: desired-vs-live diff for an ordered entry set.
//!
//! Given the desired ordered entries, the live device listing, and the
//! set of names the resource previously owned, [`plan`] synthesizes a
//! minimal batch of edit/rename/delete operations. Renames are
//! preferred over delete-plus-create because device-internal UUIDs are
//! the identity other objects refer to; a detached owned name that is
//! still live is a rename source, which is what makes bulk-reordering
//! of a rule set safe.
//!
//! [`Reconciler`] executes a plan as one multi-config call and re-lists
//! the collection for the caller to copy back into state.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::client::DeviceError;
use crate::location::Location;
use crate::manager::{EntryObject, EntryService};
use crate::xmlapi::{BatchOp, Element};

/// Errors from reconciliation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// A desired name exists on the device but was not previously owned,
    /// and the policy forbids adopting it.
    #[error("entry '{name}' already exists on the device and is not managed here")]
    UnownedName {
        /// The conflicting entry name.
        name: String,
    },

    /// A device or transport failure; the batch aborts and state is
    /// left stale.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Reconciliation policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilePolicy {
    /// Treat a desired name that is live but unowned as in-place
    /// (adopt it). When false, such a name fails with
    /// [`ReconcileError::UnownedName`].
    pub adopt_unowned: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            adopt_unowned: true,
        }
    }
}

/// Computes the minimal operation batch transforming `live` into
/// `desired`.
///
/// `desired` entries are mutated in one way only: device-opaque fields
/// are copied in from their live counterpart (in-place match or rename
/// source) so later edits cannot clobber them. `owned` is the name set
/// from the previous tfid, in its original order; rename sources are
/// taken from it first-fit.
///
/// Running the resulting batch and re-planning with the fresh listing
/// yields an empty batch (idempotence), absent concurrent mutation.
///
/// # Errors
///
/// Returns [`ReconcileError::UnownedName`] under the strict policy; see
/// [`ReconcilePolicy::adopt_unowned`].
pub fn plan<E, X, S>(
    desired: &mut [E],
    live: &[E],
    owned: &[String],
    policy: ReconcilePolicy,
    xpath: X,
    serialize: S,
) -> Result<Vec<BatchOp>, ReconcileError>
where
    E: EntryObject,
    X: Fn(&str) -> String,
    S: Fn(&E) -> Element,
{
    let live_index: HashMap<&str, usize> = live
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name(), i))
        .collect();
    let desired_names: HashSet<String> = desired.iter().map(|e| e.name().to_string()).collect();
    let owned_set: HashSet<&str> = owned.iter().map(String::as_str).collect();

    let mut ops: Vec<BatchOp> = Vec::new();
    // Owned names claimed by an in-place entry or used as a rename
    // source; whatever remains live and owned at the end is deleted.
    let mut consumed: HashSet<String> = HashSet::new();

    // In-place entries: live under their desired name already.
    for entry in desired.iter_mut() {
        let Some(&index) = live_index.get(entry.name()) else {
            continue;
        };
        if !owned_set.contains(entry.name()) && !policy.adopt_unowned {
            return Err(ReconcileError::UnownedName {
                name: entry.name().to_string(),
            });
        }
        consumed.insert(entry.name().to_string());
        let live_entry = &live[index];
        entry.copy_opaque_from(live_entry);
        if !entry.specs_match(live_entry) {
            ops.push(BatchOp::Edit {
                xpath: xpath(entry.name()),
                element: serialize(entry),
            });
        }
    }

    // Delayed entries: not live under their desired name. Prefer
    // renaming a detached owned name so the device-side identity
    // survives.
    for entry in desired.iter_mut() {
        if live_index.contains_key(entry.name()) {
            continue;
        }
        let source = owned.iter().find(|candidate| {
            !consumed.contains(*candidate)
                && live_index.contains_key(candidate.as_str())
                && !desired_names.contains(*candidate)
        });
        match source {
            Some(old_name) => {
                consumed.insert(old_name.clone());
                ops.push(BatchOp::Rename {
                    xpath: xpath(old_name),
                    new_name: entry.name().to_string(),
                });
                let live_entry = &live[live_index[old_name.as_str()]];
                entry.copy_opaque_from(live_entry);
                if !entry.specs_match(live_entry) {
                    ops.push(BatchOp::Edit {
                        xpath: xpath(entry.name()),
                        element: serialize(entry),
                    });
                }
            }
            None => {
                ops.push(BatchOp::Edit {
                    xpath: xpath(entry.name()),
                    element: serialize(entry),
                });
            }
        }
    }

    // Owned names neither kept nor renamed away, still live: deletes.
    for name in owned {
        if !consumed.contains(name) && live_index.contains_key(name.as_str()) {
            ops.push(BatchOp::Delete {
                xpath: xpath(name),
            });
        }
    }

    Ok(ops)
}

/// Executes plans against a service.
pub struct Reconciler<'a, S: EntryService> {
    service: &'a S,
    policy: ReconcilePolicy,
}

impl<'a, S: EntryService> Reconciler<'a, S> {
    /// Builds a reconciler with the given policy.
    #[must_use]
    pub fn new(service: &'a S, policy: ReconcilePolicy) -> Self {
        Self { service, policy }
    }

    /// Reconciles the desired entries against the device and returns
    /// the fresh listing.
    ///
    /// The batch is applied as a single multi-operation call, executed
    /// by the device in declared order. A conflict on any operation
    /// aborts the whole batch; the caller's state is left as-is.
    ///
    /// # Errors
    ///
    /// See [`plan`]; device failures are surfaced verbatim.
    #[instrument(skip_all, fields(desired = desired.len(), owned = owned.len()))]
    pub async fn apply(
        &self,
        location: &Location,
        mut desired: Vec<S::Entry>,
        owned: &[String],
    ) -> Result<Vec<S::Entry>, ReconcileError> {
        let live = self.service.list(location).await?;
        let ops = plan(
            &mut desired,
            &live,
            owned,
            self.policy,
            |name| self.service.xpath(location, Some(name)),
            |entry| self.service.serialize(entry),
        )?;
        debug!(operations = ops.len(), "reconcile plan computed");
        if !ops.is_empty() {
            self.service.apply_batch(location, ops).await?;
        }
        let fresh = self.service.list(location).await?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::version::ApiVersion;

    /// Minimal entry for planning tests: a name, a comparable spec, and
    /// an opaque id that must ride along.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct FakeEntry {
        name: String,
        spec: String,
        uuid: Option<String>,
    }

    impl FakeEntry {
        fn new(name: &str, spec: &str) -> Self {
            Self {
                name: name.to_string(),
                spec: spec.to_string(),
                uuid: None,
            }
        }

        fn with_uuid(mut self, uuid: &str) -> Self {
            self.uuid = Some(uuid.to_string());
            self
        }
    }

    impl EntryObject for FakeEntry {
        const SUFFIX: &'static [&'static str] = &["fake"];

        fn name(&self) -> &str {
            &self.name
        }

        fn set_name(&mut self, name: String) {
            self.name = name;
        }

        fn to_element(&self, _version: &ApiVersion) -> Element {
            Element::new("entry")
                .with_attr("name", self.name.clone())
                .with_child(Element::new("spec").with_text(self.spec.clone()))
        }

        fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
            Ok(Self {
                name: element.attr("name").unwrap_or_default().to_string(),
                spec: element.child_text("spec").unwrap_or_default(),
                uuid: element.attr("uuid").map(str::to_string),
            })
        }

        fn specs_match(&self, other: &Self) -> bool {
            self.spec == other.spec
        }

        fn copy_opaque_from(&mut self, live: &Self) {
            if self.uuid.is_none() {
                self.uuid = live.uuid.clone();
            }
        }
    }

    fn xp(name: &str) -> String {
        format!("/fake/entry[@name='{name}']")
    }

    fn ser(entry: &FakeEntry) -> Element {
        entry.to_element(&ApiVersion::default())
    }

    fn run_plan(
        desired: &mut [FakeEntry],
        live: &[FakeEntry],
        owned: &[&str],
    ) -> Vec<BatchOp> {
        let owned: Vec<String> = owned.iter().map(|s| (*s).to_string()).collect();
        plan(desired, live, &owned, ReconcilePolicy::default(), xp, ser).expect("plan")
    }

    #[test]
    fn test_no_ops_when_desired_equals_live() {
        let live = vec![FakeEntry::new("a", "X"), FakeEntry::new("b", "Y")];
        let mut desired = live.clone();
        let ops = run_plan(&mut desired, &live, &["a", "b"]);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_rename_only_change_produces_single_rename() {
        // Owned [a, b]; live [a(X), b(Y)]; desired [a(X), c(Y)].
        let live = vec![FakeEntry::new("a", "X"), FakeEntry::new("b", "Y")];
        let mut desired = vec![FakeEntry::new("a", "X"), FakeEntry::new("c", "Y")];
        let ops = run_plan(&mut desired, &live, &["a", "b"]);
        assert_eq!(
            ops,
            vec![BatchOp::Rename {
                xpath: xp("b"),
                new_name: "c".to_string(),
            }]
        );
    }

    #[test]
    fn test_dropped_entry_produces_single_delete() {
        let live = vec![
            FakeEntry::new("a", "X"),
            FakeEntry::new("b", "Y"),
            FakeEntry::new("c", "Z"),
        ];
        let mut desired = vec![FakeEntry::new("a", "X"), FakeEntry::new("c", "Z")];
        let ops = run_plan(&mut desired, &live, &["a", "b", "c"]);
        assert_eq!(ops, vec![BatchOp::Delete { xpath: xp("b") }]);
    }

    #[test]
    fn test_in_place_drift_produces_edit_with_opaque_preserved() {
        let live = vec![FakeEntry::new("a", "X").with_uuid("u-1")];
        let mut desired = vec![FakeEntry::new("a", "X2")];
        let ops = run_plan(&mut desired, &live, &["a"]);
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], BatchOp::Edit { xpath, .. } if xpath == &xp("a")));
        assert_eq!(desired[0].uuid.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_new_entry_without_source_is_created() {
        let live = vec![FakeEntry::new("a", "X")];
        let mut desired = vec![FakeEntry::new("a", "X"), FakeEntry::new("b", "Y")];
        let ops = run_plan(&mut desired, &live, &["a"]);
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], BatchOp::Edit { xpath, .. } if xpath == &xp("b")));
    }

    #[test]
    fn test_rename_with_drift_also_edits() {
        let live = vec![FakeEntry::new("b", "Y").with_uuid("u-b")];
        let mut desired = vec![FakeEntry::new("c", "Y2")];
        let ops = run_plan(&mut desired, &live, &["b"]);
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], BatchOp::Rename { xpath, new_name }
            if xpath == &xp("b") && new_name == "c"));
        assert!(matches!(&ops[1], BatchOp::Edit { xpath, .. } if xpath == &xp("c")));
        // The renamed entry keeps its device identity.
        assert_eq!(desired[0].uuid.as_deref(), Some("u-b"));
    }

    #[test]
    fn test_strict_policy_rejects_unowned_live_name() {
        let live = vec![FakeEntry::new("a", "X")];
        let mut desired = vec![FakeEntry::new("a", "X")];
        let strict = ReconcilePolicy {
            adopt_unowned: false,
        };
        let err = plan(&mut desired, &live, &[], strict, xp, ser).unwrap_err();
        assert!(matches!(err, ReconcileError::UnownedName { name } if name == "a"));
    }

    #[test]
    fn test_adopt_policy_accepts_unowned_live_name() {
        let live = vec![FakeEntry::new("a", "X")];
        let mut desired = vec![FakeEntry::new("a", "X")];
        let ops = run_plan(&mut desired, &live, &[]);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_desired_in_place_name_is_never_a_rename_source() {
        // "a" is owned and live, but it is also desired; only "b" may
        // serve as the rename source for "c".
        let live = vec![FakeEntry::new("a", "X"), FakeEntry::new("b", "Y")];
        let mut desired = vec![FakeEntry::new("c", "Y"), FakeEntry::new("a", "X")];
        let ops = run_plan(&mut desired, &live, &["a", "b"]);
        assert_eq!(
            ops,
            vec![BatchOp::Rename {
                xpath: xp("b"),
                new_name: "c".to_string(),
            }]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Renaming any subset of an owned live set produces only
        /// renames: no deletes, no creates, identity preserved.
        #[test]
        fn prop_renames_preferred_over_delete_create(
            count in 1usize..8,
            renamed_mask in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let live: Vec<FakeEntry> = (0..count)
                .map(|i| FakeEntry::new(&format!("e{i}"), &format!("spec{i}"))
                    .with_uuid(&format!("u{i}")))
                .collect();
            let owned: Vec<String> = live.iter().map(|e| e.name.clone()).collect();

            let mut desired: Vec<FakeEntry> = live
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    let mut d = FakeEntry::new(&e.name, &e.spec);
                    if renamed_mask[i] {
                        d.set_name(format!("renamed{i}"));
                    }
                    d
                })
                .collect();

            let ops = plan(&mut desired, &live, &owned, ReconcilePolicy::default(), xp, ser)
                .expect("plan");

            let renames = ops.iter().filter(|op| matches!(op, BatchOp::Rename { .. })).count();
            let deletes = ops.iter().filter(|op| matches!(op, BatchOp::Delete { .. })).count();
            let expected = renamed_mask[..count].iter().filter(|&&b| b).count();

            prop_assert_eq!(renames, expected);
            prop_assert_eq!(deletes, 0);
            // Every desired entry ends up carrying a live UUID.
            for entry in &desired {
                prop_assert!(entry.uuid.is_some());
            }
        }

        /// Planning against a listing that already matches is a no-op.
        #[test]
        fn prop_idempotent_on_matching_listing(count in 0usize..8) {
            let live: Vec<FakeEntry> = (0..count)
                .map(|i| FakeEntry::new(&format!("e{i}"), &format!("spec{i}")))
                .collect();
            let owned: Vec<String> = live.iter().map(|e| e.name.clone()).collect();
            let mut desired = live.clone();
            let ops = plan(&mut desired, &live, &owned, ReconcilePolicy::default(), xp, ser)
                .expect("plan");
            prop_assert!(ops.is_empty());
        }
    }
}
