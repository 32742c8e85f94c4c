//! Data models for catalog objects, special collections, and cursor entries

use serde::{Deserialize, Serialize};

/// Collection-type value meaning "use the parent collection's descriptor".
pub const INHERIT_PARENT_SPEC_COLL: &str = "inheritParentSpecColl";
/// Collection-type value of a collection mounted from a foreign filesystem.
pub const MOUNT_POINT: &str = "mountPoint";
/// Collection-type value of a collection aliasing another logical path.
pub const LINK_POINT: &str = "linkPoint";
/// Replica status reported for objects listed through a mounted or archive collection.
pub const NEWLY_CREATED_COPY: i32 = 1;

const HIERARCHY_DELIMITER: char = ';';
const CACHE_FIELD_DELIMITER: &str = ";;;";

/// Kind of namespace node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Collection,
    DataObject,
}

impl ObjectKind {
    /// Selector label passed to special-collection queries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Collection => "collection",
            ObjectKind::DataObject => "dataObj",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "collection" | "coll" => Some(ObjectKind::Collection),
            "dataObj" | "data_object" | "data" => Some(ObjectKind::DataObject),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive formats that can back a struct-file collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructFileType {
    Haaw,
    Tar,
    Msso,
}

impl StructFileType {
    pub const ALL: [StructFileType; 3] = [
        StructFileType::Haaw,
        StructFileType::Tar,
        StructFileType::Msso,
    ];

    /// Collection-type value stored in the catalog for this archive format.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            StructFileType::Haaw => "haawStructFile",
            StructFileType::Tar => "tarStructFile",
            StructFileType::Msso => "mssoStructFile",
        }
    }

    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }
}

/// Classification of a special collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecCollClass {
    Mounted,
    Linked,
    StructFile(StructFileType),
}

/// Descriptor of a collection whose children are not plain catalog rows.
///
/// Descriptors are copied, never shared: a child that inherits its parent's
/// classification receives its own clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCollection {
    pub class: SpecCollClass,
    /// Logical path of the special collection itself.
    pub collection: String,
    /// Redirection target (linked) or archive object path (struct file).
    pub obj_path: String,
    /// Physical backing path (mounted) or link target as recorded in the catalog (linked).
    pub phy_path: String,
    pub resource: String,
    pub resc_hier: String,
    pub cache_dir: String,
    pub cache_dirty: bool,
}

impl SpecialCollection {
    fn empty(class: SpecCollClass, collection: &str) -> Self {
        Self {
            class,
            collection: collection.to_string(),
            obj_path: String::new(),
            phy_path: String::new(),
            resource: String::new(),
            resc_hier: String::new(),
            cache_dir: String::new(),
            cache_dirty: false,
        }
    }

    /// Build a mounted-collection descriptor.
    #[must_use]
    pub fn mounted(collection: &str, phy_path: &str, resc_hier: &str) -> Self {
        Self {
            phy_path: phy_path.to_string(),
            resource: first_resource(resc_hier).to_string(),
            resc_hier: resc_hier.to_string(),
            ..Self::empty(SpecCollClass::Mounted, collection)
        }
    }

    /// Build a linked-collection descriptor redirecting to `target`.
    #[must_use]
    pub fn linked(collection: &str, target: &str) -> Self {
        Self {
            obj_path: target.to_string(),
            phy_path: target.to_string(),
            ..Self::empty(SpecCollClass::Linked, collection)
        }
    }

    /// Build an archive-backed descriptor.
    #[must_use]
    pub fn struct_file(kind: StructFileType, collection: &str, archive_path: &str) -> Self {
        Self {
            obj_path: archive_path.to_string(),
            ..Self::empty(SpecCollClass::StructFile(kind), collection)
        }
    }

    /// Resolve a catalog collection-type value into a descriptor.
    ///
    /// An empty type means "no special collection". Unknown types are
    /// reported and treated the same way. The inherit sentinel is not handled
    /// here since it needs the parent's descriptor.
    #[must_use]
    pub fn resolve(coll_type: &str, collection: &str, info1: &str, info2: &str) -> Option<Self> {
        match coll_type {
            "" => None,
            MOUNT_POINT => Some(Self::mounted(collection, info1, info2)),
            LINK_POINT => Some(Self {
                phy_path: info1.to_string(),
                ..Self::empty(SpecCollClass::Linked, collection)
            }),
            other => {
                let Some(kind) = StructFileType::from_type_name(other) else {
                    log::warn!("Unmatched special collection type '{other}' for {collection}");
                    return None;
                };
                let mut spec = Self::struct_file(kind, collection, info1);
                spec.apply_cache_info(info2);
                Some(spec)
            }
        }
    }

    /// Parse the `cacheDir;;;rescHier;;;cacheDirty` string kept for archives.
    fn apply_cache_info(&mut self, info: &str) {
        if info.is_empty() {
            return;
        }

        let mut fields = info.splitn(3, CACHE_FIELD_DELIMITER);
        let (Some(cache_dir), Some(hier), Some(dirty)) = (fields.next(), fields.next(), fields.next())
        else {
            log::warn!(
                "Malformed archive cache info '{info}' for {}",
                self.collection
            );
            return;
        };

        self.cache_dir = cache_dir.to_string();
        self.resource = first_resource(hier).to_string();
        self.resc_hier = hier.to_string();
        self.cache_dirty = dirty.trim().parse::<i32>().unwrap_or(0) != 0;
    }

    /// Catalog collection-type value for this descriptor.
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        match self.class {
            SpecCollClass::Mounted => MOUNT_POINT,
            SpecCollClass::Linked => LINK_POINT,
            SpecCollClass::StructFile(kind) => kind.type_name(),
        }
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.class == SpecCollClass::Linked
    }

    /// Logical path queries must target while a linked collection is open.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        if !self.is_linked() {
            return None;
        }
        [self.obj_path.as_str(), self.phy_path.as_str()]
            .into_iter()
            .find(|path| !path.is_empty())
    }
}

/// First element of a `;`-separated resource hierarchy.
#[must_use]
pub fn first_resource(hier: &str) -> &str {
    hier.split(HIERARCHY_DELIMITER).next().unwrap_or_default()
}

/// Result of statting a logical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjStat {
    pub path: String,
    pub kind: ObjectKind,
    pub owner: String,
    pub create_time: String,
    pub modify_time: String,
    pub size: i64,
    pub special_collection: Option<SpecialCollection>,
}

/// A sub-collection produced by the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCollectionEntry {
    /// Full logical path of the sub-collection.
    pub name: String,
    pub owner: String,
    pub create_time: String,
    pub modify_time: String,
    pub special_collection: Option<SpecialCollection>,
}

/// A (replica-reduced) data object produced by the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObjectEntry {
    pub collection: String,
    pub name: String,
    pub data_id: String,
    pub owner: String,
    pub create_time: String,
    pub modify_time: String,
    /// `-1` when the catalog did not report a size.
    pub size: i64,
    pub mode: i32,
    pub replica_number: i32,
    pub replica_status: i32,
    pub resource: String,
    pub resc_hier: String,
    pub checksum: String,
    pub physical_path: String,
    pub data_type: String,
    pub special_collection: Option<SpecialCollection>,
}

impl DataObjectEntry {
    /// Full logical path of the data object.
    #[must_use]
    pub fn path(&self) -> String {
        join_logical(&self.collection, &self.name)
    }
}

/// One logical entry of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionEntry {
    SubCollection(SubCollectionEntry),
    DataObject(DataObjectEntry),
}

impl CollectionEntry {
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            CollectionEntry::SubCollection(_) => ObjectKind::Collection,
            CollectionEntry::DataObject(_) => ObjectKind::DataObject,
        }
    }

    /// Full logical path of the entry.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            CollectionEntry::SubCollection(coll) => coll.name.clone(),
            CollectionEntry::DataObject(data) => data.path(),
        }
    }

    #[must_use]
    pub fn special_collection(&self) -> Option<&SpecialCollection> {
        match self {
            CollectionEntry::SubCollection(coll) => coll.special_collection.as_ref(),
            CollectionEntry::DataObject(data) => data.special_collection.as_ref(),
        }
    }

    #[must_use]
    pub fn as_sub_collection(&self) -> Option<&SubCollectionEntry> {
        match self {
            CollectionEntry::SubCollection(coll) => Some(coll),
            CollectionEntry::DataObject(_) => None,
        }
    }

    #[must_use]
    pub fn as_data_object(&self) -> Option<&DataObjectEntry> {
        match self {
            CollectionEntry::DataObject(data) => Some(data),
            CollectionEntry::SubCollection(_) => None,
        }
    }
}

/// Join a collection path and a child name.
#[must_use]
pub fn join_logical(collection: &str, name: &str) -> String {
    if collection.ends_with('/') {
        format!("{collection}{name}")
    } else {
        format!("{collection}/{name}")
    }
}

/// Parent of a logical path (`/` for top-level names, `None` for `/` itself).
#[must_use]
pub fn parent_of(path: &str) -> Option<&str> {
    if path == "/" || path.is_empty() {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Final component of a logical path.
#[must_use]
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
