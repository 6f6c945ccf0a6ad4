//! Skeleton registry: per-dataset joint counts, action vocabularies and
//! body-member topology.
//!
//! The registry is resolved once at startup into a [`Skeleton`] value; nothing
//! here carries mutable state. Member tables describe connectivity only, never
//! positions, and are shared between structured occlusion sampling and
//! rendering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported skeletal datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkeletonDataset {
    NtuRgbd,
    Msrc12,
    Human36,
}

impl SkeletonDataset {
    /// Short identifier used in log lines and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkeletonDataset::NtuRgbd => "NTURGBD",
            SkeletonDataset::Msrc12 => "MSRC12",
            SkeletonDataset::Human36 => "Human36",
        }
    }
}

/// Which side of the body a member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// A named chain of connected joints (e.g. the left arm).
///
/// Joint lists may revisit a joint to describe branching chains; the order is
/// the drawing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyMember {
    pub joints: Vec<usize>,
    pub side: Side,
}

impl BodyMember {
    fn new(joints: &[usize], side: Side) -> Self {
        BodyMember {
            joints: joints.to_vec(),
            side,
        }
    }
}

/// Resolved skeleton metadata for one dataset.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub dataset: SkeletonDataset,
    pub njoints: usize,
    pub actions: Vec<&'static str>,
    pub members: BTreeMap<&'static str, BodyMember>,
}

impl Skeleton {
    /// Resolve the registry entry for `dataset`.
    ///
    /// For Human3.6M the member table is expressed in full 32-joint indices
    /// and remapped through the reduced used-joint subsequence; a member joint
    /// absent from that subsequence is a hard lookup error, never a silent
    /// truncation.
    pub fn for_dataset(dataset: SkeletonDataset) -> Result<Skeleton> {
        let skeleton = match dataset {
            SkeletonDataset::NtuRgbd => Skeleton {
                dataset,
                njoints: NTU_NJOINTS,
                actions: NTU_ACTIONS.to_vec(),
                members: ntu_members(),
            },
            SkeletonDataset::Msrc12 => Skeleton {
                dataset,
                njoints: MSRC_NJOINTS,
                actions: MSRC_ACTIONS.to_vec(),
                members: msrc_members(),
            },
            SkeletonDataset::Human36 => Skeleton {
                dataset,
                njoints: H36_USED_JOINTS.len(),
                actions: H36_ACTIONS.to_vec(),
                members: remap_members(h36_members(), H36_USED_JOINTS)?,
            },
        };
        skeleton.validate()?;
        Ok(skeleton)
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Union of every joint reachable through the member table.
    pub fn member_joint_union(&self) -> Vec<usize> {
        let mut joints: Vec<usize> = self
            .members
            .values()
            .flat_map(|m| m.joints.iter().copied())
            .collect();
        joints.sort_unstable();
        joints.dedup();
        joints
    }

    fn validate(&self) -> Result<()> {
        for member in self.members.values() {
            for &joint in &member.joints {
                if joint >= self.njoints {
                    return Err(Error::JointOutOfRange {
                        joint,
                        njoints: self.njoints,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Remap a member table expressed in full-skeleton indices into positions
/// within `used`, failing on any joint outside the subsequence.
fn remap_members(
    members: BTreeMap<&'static str, BodyMember>,
    used: &[usize],
) -> Result<BTreeMap<&'static str, BodyMember>> {
    let mut remapped = BTreeMap::new();
    for (name, member) in members {
        let joints = member
            .joints
            .iter()
            .map(|&joint| {
                used.iter()
                    .position(|&u| u == joint)
                    .ok_or(Error::JointNotInSubset { joint })
            })
            .collect::<Result<Vec<usize>>>()?;
        remapped.insert(
            name,
            BodyMember {
                joints,
                side: member.side,
            },
        );
    }
    Ok(remapped)
}

pub const NTU_NJOINTS: usize = 25;

pub const NTU_ACTIONS: [&str; 60] = [
    "drink water",
    "eat meal/snack",
    "brushing teeth",
    "brushing hair",
    "drop",
    "pickup",
    "throw",
    "sitting down",
    "standing up (from sitting position)",
    "clapping",
    "reading",
    "writing",
    "tear up paper",
    "wear jacket",
    "take off jacket",
    "wear a shoe",
    "take off a shoe",
    "wear on glasses",
    "take off glasses",
    "put on a hat/cap",
    "take off a hat/cap",
    "cheer up",
    "hand waving",
    "kicking something",
    "put something inside pocket / take out something from pocket",
    "hopping (one foot jumping)",
    "jump up",
    "make a phone call/answer phone",
    "playing with phone/tablet",
    "typing on a keyboard",
    "pointing to something with finger",
    "taking a selfie",
    "check time (from watch)",
    "rub two hands together",
    "nod head/bow",
    "shake head",
    "wipe face",
    "salute",
    "put the palms together",
    "cross hands in front (say stop)",
    "sneeze/cough",
    "staggering",
    "falling",
    "touch head (headache)",
    "touch chest (stomachache/heart pain)",
    "touch back (backache)",
    "touch neck (neckache)",
    "nausea or vomiting condition",
    "use a fan (with hand or paper)/feeling warm",
    "punching/slapping other person",
    "kicking other person",
    "pushing other person",
    "pat on back of other person",
    "point finger at the other person",
    "hugging other person",
    "giving something to other person",
    "touch other person's pocket",
    "handshaking",
    "walking towards each other",
    "walking apart from each other",
];

fn ntu_members() -> BTreeMap<&'static str, BodyMember> {
    BTreeMap::from([
        (
            "left_arm",
            BodyMember::new(&[20, 8, 9, 10, 11, 23, 11, 24], Side::Left),
        ),
        (
            "right_arm",
            BodyMember::new(&[20, 4, 5, 6, 7, 21, 7, 22], Side::Right),
        ),
        ("head", BodyMember::new(&[20, 2, 3], Side::Right)),
        ("torso", BodyMember::new(&[20, 1, 0], Side::Right)),
        ("left_leg", BodyMember::new(&[0, 16, 17, 18, 19], Side::Left)),
        ("right_leg", BodyMember::new(&[0, 12, 13, 14, 15], Side::Right)),
    ])
}

pub const MSRC_NJOINTS: usize = 20;

pub const MSRC_ACTIONS: [&str; 12] = [
    "Start system",
    "Duck",
    "Push right",
    "Googles",
    "Wind it up",
    "Shoot",
    "Bow",
    "Throw",
    "Had enough",
    "Change weapon",
    "Beat both",
    "Kick",
];

fn msrc_members() -> BTreeMap<&'static str, BodyMember> {
    BTreeMap::from([
        ("left_arm", BodyMember::new(&[2, 4, 5, 6, 7], Side::Left)),
        ("right_arm", BodyMember::new(&[2, 8, 9, 10, 11], Side::Right)),
        ("head", BodyMember::new(&[1, 2, 3], Side::Right)),
        ("torso", BodyMember::new(&[1, 0], Side::Right)),
        ("left_leg", BodyMember::new(&[0, 12, 13, 14, 15], Side::Left)),
        ("right_leg", BodyMember::new(&[0, 16, 17, 18, 19], Side::Right)),
    ])
}

/// Indices of the Human3.6M joints actually carried through training, out of
/// the full 32-joint capture rig.
pub const H36_USED_JOINTS: &[usize] = &[
    0, 1, 2, 3, 6, 7, 8, 12, 13, 14, 15, 17, 18, 19, 25, 26, 27,
];

pub const H36_ACTIONS: [&str; 15] = [
    "Directions",
    "Discussion",
    "Eating",
    "Greeting",
    "Phoning",
    "Posing",
    "Purchases",
    "Sitting",
    "SittingDown",
    "Smoking",
    "Photo",
    "Waiting",
    "Walking",
    "WalkDog",
    "WalkTogether",
];

/// Member table in full-rig indices; remapped through [`H36_USED_JOINTS`]
/// before use.
fn h36_members() -> BTreeMap<&'static str, BodyMember> {
    BTreeMap::from([
        ("left_arm", BodyMember::new(&[19, 18, 17, 13], Side::Left)),
        ("right_arm", BodyMember::new(&[27, 26, 25, 13], Side::Right)),
        ("head", BodyMember::new(&[15, 14, 13], Side::Right)),
        ("torso", BodyMember::new(&[0, 12, 13], Side::Right)),
        ("left_leg", BodyMember::new(&[0, 6, 7, 8], Side::Left)),
        ("right_leg", BodyMember::new(&[0, 1, 2, 3], Side::Right)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntu_registry_shape() {
        let skeleton = Skeleton::for_dataset(SkeletonDataset::NtuRgbd).unwrap();
        assert_eq!(skeleton.njoints, 25);
        assert_eq!(skeleton.num_actions(), 60);
        assert_eq!(skeleton.members.len(), 6);
    }

    #[test]
    fn msrc_registry_shape() {
        let skeleton = Skeleton::for_dataset(SkeletonDataset::Msrc12).unwrap();
        assert_eq!(skeleton.njoints, 20);
        assert_eq!(skeleton.num_actions(), 12);
    }

    #[test]
    fn human36_members_are_remapped_into_reduced_indices() {
        let skeleton = Skeleton::for_dataset(SkeletonDataset::Human36).unwrap();
        assert_eq!(skeleton.njoints, 17);
        for member in skeleton.members.values() {
            for &joint in &member.joints {
                assert!(joint < 17);
            }
        }
        // left_arm [19, 18, 17, 13] maps to positions in the used-joint list.
        let left_arm = &skeleton.members["left_arm"];
        assert_eq!(left_arm.joints, vec![13, 12, 11, 8]);
    }

    #[test]
    fn remap_rejects_joints_outside_subsequence() {
        let members = BTreeMap::from([("arm", BodyMember::new(&[5, 99], Side::Left))]);
        let err = remap_members(members, &[0, 5, 7]).unwrap_err();
        assert!(matches!(err, Error::JointNotInSubset { joint: 99 }));
    }

    #[test]
    fn member_union_is_within_joint_count() {
        for dataset in [
            SkeletonDataset::NtuRgbd,
            SkeletonDataset::Msrc12,
            SkeletonDataset::Human36,
        ] {
            let skeleton = Skeleton::for_dataset(dataset).unwrap();
            let union = skeleton.member_joint_union();
            assert!(!union.is_empty());
            assert!(union.iter().all(|&j| j < skeleton.njoints));
        }
    }
}
