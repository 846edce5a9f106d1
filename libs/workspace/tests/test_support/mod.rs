#![allow(dead_code)]

//! An on-disk fixture project shared by the integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use assetlsp_workspace::{DiscoveryIndex, FileWorkspace, Project, SchemaDatabase};

pub const SUPPLY_GUID: &str = "8e5d2f0c4a1b4c3d9e8f7a6b5c4d3e2f";
pub const RIFLE_GUID: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

pub const SCHEMA: &str = r#"{
    "enums": [
        { "name": "EBladeType", "flags": true, "members": ["SLASH", "STAB", "BLUNT"] }
    ],
    "types": [
        { "name": "Asset" },
        { "name": "ItemAsset", "parent": "Asset", "category": "ITEM",
          "properties": [
            { "key": "Type", "type": "String" },
            { "key": "Health", "type": "Int32", "default": 0 },
            { "key": "Uniform_Scale", "type": "Boolean" },
            { "key": "Scale", "type": "Float32", "default": [
                { "And": [ { "Variable": "Health", "Operation": "gt", "Comparand": 50 } ], "Value": 2 },
                { "Value": 1 }
            ] },
            { "key": "Blades", "type": "EBladeType" },
            { "key": "Blueprint", "type": "GuidOrId", "category": "ITEM" },
            { "key": "Supply_Amount", "type": "Int32", "fileCrossRef": "Blueprint",
              "default": "@($cr$::SupplyAsset::Amount)" }
          ],
          "localization": [
            { "key": "Name", "type": "String" },
            { "key": "Description", "type": "String", "default": "No description" }
          ] },
        { "name": "SupplyAsset", "parent": "ItemAsset",
          "properties": [ { "key": "Amount", "type": "Int32", "default": 1 } ] }
    ]
}"#;

const RIFLE: &str = r#"GUID 0f1e2d3c4b5a69788796a5b4c3d2e1f0
Type ItemAsset
ID 7
Health 75
Blades SLASH, BLUNT
Blueprint 8e5d2f0c4a1b4c3d9e8f7a6b5c4d3e2f
"#;

const PISTOL: &str = "Type ItemAsset\nID 8\nHealth 20\nBlueprint 42\n";

const SUPPLY: &str = "GUID 8e5d2f0c4a1b4c3d9e8f7a6b5c4d3e2f\nType SupplyAsset\nID 42\nAmount 12\n";

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().expect("fixture parent")).expect("fixture dir");
    fs::write(path, text).expect("fixture file");
}

static ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Fixture tree:
///
/// ```text
/// schema.json
/// Items/Rifle/Rifle.dat, English.dat
/// Items/Pistol/Asset.dat
/// Items/Supply_Crate/Supply_Crate.dat
/// ```
pub fn root() -> &'static Path {
    ROOT.get_or_init(|| {
        let root = std::env::temp_dir().join(format!(
            "assetlsp-fixture-{}",
            uuid::Uuid::new_v4().simple()
        ));
        write(&root.join("schema.json"), SCHEMA);
        write(&root.join("Items/Rifle/Rifle.dat"), RIFLE);
        write(
            &root.join("Items/Rifle/English.dat"),
            "Name Military Rifle\n",
        );
        write(&root.join("Items/Pistol/Asset.dat"), PISTOL);
        write(&root.join("Items/Supply_Crate/Supply_Crate.dat"), SUPPLY);
        root
    })
}

pub fn items() -> PathBuf {
    root().join("Items")
}

pub fn schema() -> SchemaDatabase {
    SchemaDatabase::from_json_str(SCHEMA).expect("fixture schema")
}

static PROJECT: OnceLock<Project> = OnceLock::new();

pub fn project() -> &'static Project {
    PROJECT.get_or_init(|| {
        let schema = schema();
        let discovery = DiscoveryIndex::scan(&items(), &schema).expect("fixture scan");
        Project::new(schema, discovery, FileWorkspace::new(4))
    })
}
