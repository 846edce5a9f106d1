//! A project loaded from disk: discovery, cross references and defaults

use std::path::Path;

use assetlsp_values::{DiscoveryEnvironment, DynamicValue, Evaluated, Scalar, SourceFile};
use assetlsp_workspace::{Error, Project};
use uuid::Uuid;

mod test_support;

use test_support::{items, project, root, RIFLE_GUID, SUPPLY_GUID};

fn value(scalar: Scalar) -> Option<Evaluated> {
    Some(Evaluated::Value(scalar))
}

fn rifle() -> std::sync::Arc<assetlsp_workspace::AssetDocument> {
    project()
        .open(&items().join("Rifle/Rifle.dat"))
        .unwrap()
}

#[test]
fn test_discovery_skips_localization_files() {
    let project = project();
    assert_eq!(project.discovery().len(), 3);

    let mut names: Vec<_> = project
        .discovery()
        .files()
        .iter()
        .map(|f| f.asset_name.to_string())
        .collect();
    names.sort();
    assert_eq!(names, ["Pistol", "Rifle", "Supply_Crate"]);

    let supply = project
        .discovery()
        .find_file_by_guid(Uuid::parse_str(SUPPLY_GUID).unwrap())
        .unwrap();
    assert_eq!(supply.id, 42);
    assert_eq!(supply.type_name.as_deref(), Some("SupplyAsset"));
    assert_eq!(supply.category, assetlsp_values::AssetCategory::Item);
    assert_eq!(
        project
            .discovery()
            .find_by_path(&items().join("Rifle/Rifle.dat"))
            .and_then(|f| f.guid),
        Uuid::parse_str(RIFLE_GUID).ok()
    );
}

#[test]
fn test_literal_values() {
    let project = project();
    let rifle = rifle();
    assert_eq!(
        project.property_value(&*rifle, "Health").unwrap(),
        value(Scalar::Int32(75))
    );
    assert_eq!(
        project.property_value(&*rifle, "Uniform_Scale").unwrap(),
        Some(Evaluated::Null)
    );
}

#[test]
fn test_default_switch_follows_the_file() {
    let project = project();
    assert_eq!(
        project.property_value(&*rifle(), "Scale").unwrap(),
        value(Scalar::Float32(2.0))
    );

    let pistol = project.open(&items().join("Pistol/Asset.dat")).unwrap();
    assert_eq!(pistol.asset_name(), Some("Pistol"));
    assert_eq!(
        project.property_value(&*pistol, "Scale").unwrap(),
        value(Scalar::Float32(1.0))
    );
}

#[test]
fn test_cross_reference_by_guid() {
    let project = project();
    assert_eq!(
        project.property_value(&*rifle(), "Supply_Amount").unwrap(),
        value(Scalar::Int32(12))
    );
}

#[test]
fn test_cross_reference_by_id() {
    let project = project();
    let pistol = project.open(&items().join("Pistol/Asset.dat")).unwrap();
    assert_eq!(
        project.property_value(&*pistol, "Supply_Amount").unwrap(),
        value(Scalar::Int32(12))
    );
}

#[test]
fn test_cross_reference_depth_is_configurable() {
    let project = Project::load(&root().join("schema.json"), Some(&items()), 8)
        .unwrap()
        .with_max_cross_reference_depth(0);
    let rifle = project.open(&items().join("Rifle/Rifle.dat")).unwrap();
    assert_eq!(
        project.property_value(&*rifle, "Supply_Amount").unwrap(),
        None
    );
}

#[test]
fn test_localized_values() {
    let project = project();
    let rifle = rifle();
    assert_eq!(
        project.property_value(&*rifle, "Name").unwrap(),
        value(Scalar::string("Military Rifle"))
    );
    assert_eq!(
        project.property_value(&*rifle, "Description").unwrap(),
        value(Scalar::string("No description"))
    );
}

#[test]
fn test_expressions_against_loaded_files() {
    let project = project();
    let rifle = rifle();
    let ctx = project.property_context(&*rifle, "Health").unwrap();
    let doubled = DynamicValue::parse("=MUL(@Health 2)", Some(&assetlsp_values::PropertyType::INT32))
        .unwrap();
    assert_eq!(doubled.try_evaluate_boxed(&ctx), value(Scalar::Int32(150)));
}

#[test]
fn test_property_errors() {
    let project = project();
    let rifle = rifle();
    assert!(matches!(
        project.property(&*rifle, "Nonexistent"),
        Err(Error::InvalidSchema(_))
    ));

    let untyped = assetlsp_workspace::AssetDocument::parse("Loose", "Health 3").unwrap();
    assert!(matches!(
        project.property(&untyped, "Health"),
        Err(Error::UnknownType(_))
    ));

    assert!(matches!(
        project.open(Path::new("/nonexistent/assetlsp/Missing.dat")),
        Err(Error::IoError(_))
    ));
}
