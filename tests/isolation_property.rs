//! Property tests for isolation group invariants
//!
//! For any forest of descriptors (roots plus direct extensions) the builder
//! yields one group per root, owned entirely by that root's settings.

use proptest::prelude::*;
use std::cmp::Ordering;
use std::path::PathBuf;

use module_isolation::module::{DescriptorSet, IsolationGroupBuilder, ModuleDescriptor};
use module_isolation::HostVersion;

#[derive(Debug, Clone)]
struct RootShape {
    child_first: bool,
    version: Option<(u32, u32, u32)>,
    extensions: Vec<bool>,
}

fn root_shape() -> impl Strategy<Value = RootShape> {
    (
        any::<bool>(),
        proptest::option::of((3u32..8, 0u32..10, 0u32..5)),
        proptest::collection::vec(any::<bool>(), 0..4),
    )
        .prop_map(|(child_first, version, extensions)| RootShape {
            child_first,
            version,
            extensions,
        })
}

fn descriptors(roots: &[RootShape]) -> Vec<ModuleDescriptor> {
    let mut descriptors = Vec::new();
    for (i, root) in roots.iter().enumerate() {
        let key = format!("root{}", i);
        let mut descriptor = ModuleDescriptor::new(
            key.clone(),
            PathBuf::from(format!("/plugins/{}.jar", key)),
            format!("org.root{}.Plugin", i),
        )
        .with_child_first(root.child_first);
        if let Some((major, minor, patch)) = root.version {
            descriptor = descriptor.with_minimum_host_version(HostVersion::new(major, minor, patch));
        }
        descriptors.push(descriptor);

        for (j, child_first) in root.extensions.iter().enumerate() {
            let ext_key = format!("{}ext{}", key, j);
            descriptors.push(
                ModuleDescriptor::new(
                    ext_key.clone(),
                    PathBuf::from(format!("/plugins/{}.jar", ext_key)),
                    format!("org.root{}.Extension{}", i, j),
                )
                .with_base_module(key.clone())
                .with_child_first(*child_first),
            );
        }
    }
    descriptors
}

proptest! {
    #[test]
    fn test_one_group_per_root(roots in proptest::collection::vec(root_shape(), 1..6)) {
        let set = DescriptorSet::from_descriptors(descriptors(&roots)).unwrap();
        let groups = IsolationGroupBuilder::new().build(&set).unwrap();

        prop_assert_eq!(groups.len(), roots.len());

        // Every module lands in exactly one group
        let total_members: usize = groups.iter().map(|g| g.entry_classes().len()).sum();
        prop_assert_eq!(total_members, set.len());

        for group in &groups {
            let i: usize = group.base_key()["root".len()..].parse().unwrap();
            let root = &roots[i];

            prop_assert_eq!(group.entry_classes().len(), root.extensions.len() + 1);
            prop_assert_eq!(group.files().len(), root.extensions.len() + 1);
            for key in group.member_keys() {
                let artifact = set.get(key).unwrap().artifact.clone();
                prop_assert!(group.contains_file(&artifact));
            }
        }
    }

    #[test]
    fn test_root_owns_isolation_settings(roots in proptest::collection::vec(root_shape(), 1..6)) {
        let set = DescriptorSet::from_descriptors(descriptors(&roots)).unwrap();
        let groups = IsolationGroupBuilder::new().build(&set).unwrap();
        let threshold = HostVersion::new(5, 2, 0);

        for group in &groups {
            let root = set.get(group.base_key()).unwrap();
            prop_assert_eq!(group.is_self_first(), root.child_first);

            let expected = root
                .minimum_host_version
                .as_ref()
                .map_or(false, |v| v.compare_ignoring_qualifier(&threshold) == Ordering::Less);
            prop_assert_eq!(group.is_compatibility_mode(), expected);
        }
    }

    #[test]
    fn test_groups_are_sorted_and_stable(roots in proptest::collection::vec(root_shape(), 1..6)) {
        let set = DescriptorSet::from_descriptors(descriptors(&roots)).unwrap();
        let builder = IsolationGroupBuilder::new();
        let first = builder.build(&set).unwrap();
        let second = builder.build(&set).unwrap();

        prop_assert_eq!(&first, &second);
        let keys: Vec<&str> = first.iter().map(|g| g.base_key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }
}
