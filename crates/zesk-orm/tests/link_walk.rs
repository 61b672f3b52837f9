//! Link walking and member queries over a small class graph.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use zesk_orm::{
    member_query, ClassDeclaration, HasManySpec, IdColumn, LinkOptions, LinkWalker, MemberType,
    MetadataRegistry, OrmError, Record,
};
use zesk_schema::{MySqlDialect, SqlValue};

fn id(name: &str) -> IdColumn {
    IdColumn::Named(name.to_string())
}

fn site_registry() -> MetadataRegistry {
    let registry = MetadataRegistry::default();
    registry.declare(
        ClassDeclaration::new("TestSiteMonitor")
            .table("Test_SiteMonitor")
            .id_column(id("ID"))
            .has_one("Site", "TestSite"),
    );
    registry.declare(
        ClassDeclaration::new("TestSite")
            .table("Test_Site")
            .id_column(id("ID"))
            .has_one("Account", "TestAccount"),
    );
    registry.declare(
        ClassDeclaration::new("TestAccount")
            .table("Test_Account")
            .id_column(id("ID"))
            .column("Cancelled", MemberType::Timestamp),
    );
    registry
}

fn person_registry() -> MetadataRegistry {
    let registry = MetadataRegistry::default();
    registry.declare(
        ClassDeclaration::new("TestPerson")
            .id_column(id("PersonID"))
            .column("PersonID", MemberType::Id)
            .column("Name", MemberType::String)
            .column("Parent", MemberType::Integer)
            .has_many(
                "Children",
                HasManySpec::new("TestPerson").foreign_key("Parent"),
            )
            .has_many(
                "Pets",
                HasManySpec::new("TestPet")
                    .link_class("TestPersonPet")
                    .foreign_key("Person")
                    .far_key("Pet"),
            ),
    );
    registry.declare(
        ClassDeclaration::new("TestPet")
            .id_column(id("PetID"))
            .column("PetID", MemberType::Id)
            .column("Type", MemberType::String),
    );
    registry.declare(
        ClassDeclaration::new("TestPersonPet")
            .id_column(IdColumn::None)
            .column("Person", MemberType::Integer)
            .column("Pet", MemberType::Integer),
    );
    registry
}

fn sql(query: &zesk_orm::Select) -> String {
    query.to_sql(&MySqlDialect::new())
}

const SITE_ACCOUNT: &str = "SELECT `X`.* FROM `Test_SiteMonitor` AS `X`\n\
    INNER JOIN `Test_Site` AS `Site` ON `Site`.`ID`=`X`.`Site`\n\
    INNER JOIN `Test_Account` AS `Account` ON `Account`.`ID`=`Site`.`Account`\n\
    WHERE `Account`.`Cancelled` IS NULL";

#[test]
fn test_has_one_path() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    query
        .link(&registry, "TestAccount", LinkOptions::path("Site.Account"))
        .unwrap();
    query.add_where("Account.Cancelled", SqlValue::Null);
    assert_eq!(sql(&query), SITE_ACCOUNT);
}

#[test]
fn test_repeated_links_are_idempotent() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    for _ in 0..3 {
        query
            .link(&registry, "TestAccount", LinkOptions::path("Site.Account"))
            .unwrap();
    }
    query
        .link(&registry, "TestSite", LinkOptions::default())
        .unwrap();
    query.add_where("Account.Cancelled", SqlValue::Null);
    assert_eq!(sql(&query), SITE_ACCOUNT);
}

#[test]
fn test_alias_overrides_last_segment() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    let options = LinkOptions::path("Site.Account").alias("dude");
    query.link(&registry, "TestAccount", options.clone()).unwrap();
    query.link(&registry, "TestAccount", options).unwrap();
    query.add_where("dude.Cancelled", SqlValue::Null);
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `Test_SiteMonitor` AS `X`\n\
         INNER JOIN `Test_Site` AS `Site` ON `Site`.`ID`=`X`.`Site`\n\
         INNER JOIN `Test_Account` AS `dude` ON `dude`.`ID`=`Site`.`Account`\n\
         WHERE `dude`.`Cancelled` IS NULL"
    );
}

#[test]
fn test_walk_through_an_existing_alias() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    query
        .link(&registry, "TestSite", LinkOptions::default().alias("S"))
        .unwrap();
    query
        .link(
            &registry,
            "TestAccount",
            LinkOptions::path("S.Account").alias("A"),
        )
        .unwrap();
    query.add_where("A.Cancelled", SqlValue::Null);
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `Test_SiteMonitor` AS `X`\n\
         INNER JOIN `Test_Site` AS `S` ON `S`.`ID`=`X`.`Site`\n\
         INNER JOIN `Test_Account` AS `A` ON `A`.`ID`=`S`.`Account`\n\
         WHERE `A`.`Cancelled` IS NULL"
    );
}

#[test]
fn test_optional_link_uses_left_outer_join() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    query
        .link(&registry, "TestSite", LinkOptions::default().optional())
        .unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `Test_SiteMonitor` AS `X`\n\
         LEFT OUTER JOIN `Test_Site` AS `Site` ON `Site`.`ID`=`X`.`Site`"
    );
}

#[test]
fn test_alias_collision() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    query
        .link(&registry, "TestSite", LinkOptions::default().alias("A"))
        .unwrap();
    let err = query
        .link(
            &registry,
            "TestAccount",
            LinkOptions::path("Site.Account").alias("A"),
        )
        .unwrap_err();
    assert!(matches!(err, OrmError::AliasCollision { ref alias, .. } if alias == "A"));
}

#[test]
fn test_unresolved_segment() {
    let registry = site_registry();
    let mut query = registry.select("TestSiteMonitor").unwrap();
    let err = query
        .link(&registry, "TestAccount", LinkOptions::path("Site.Foo"))
        .unwrap_err();
    assert_eq!(err.to_string(), "No path 'Foo' found in class 'TestSite'");
    assert!(registry
        .select("TestSiteMonitor")
        .unwrap()
        .link(&registry, "TestPerson", LinkOptions::default())
        .is_err());
}

#[test]
fn test_direct_member_query() {
    let registry = person_registry();
    let person = Record::new("TestPerson").with_id(1_i64);
    let query = member_query(&registry, &person, "Children").unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `Children`.* FROM `TestPerson` AS `Children`\n\
         WHERE `Children`.`Parent` = 1"
    );
}

#[test]
fn test_link_table_member_query() {
    let registry = person_registry();
    let person = Record::new("TestPerson").with_id(1_i64);
    let query = member_query(&registry, &person, "Pets").unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `Pets`.* FROM `TestPet` AS `Pets`\n\
         INNER JOIN `TestPersonPet` AS `Pets_join` ON `Pets_join`.`Pet`=`Pets`.`PetID`\n\
         WHERE `Pets_join`.`Person` = 1"
    );
}

#[test]
fn test_member_query_for_new_object_skips_owner() {
    let registry = person_registry();
    let person = Record::new("TestPerson");
    let query = member_query(&registry, &person, "Children").unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `Children`.* FROM `TestPerson` AS `Children`"
    );
    let err = member_query(&registry, &person, "Name").unwrap_err();
    assert!(matches!(err, OrmError::Semantics(_)));
}

#[test]
fn test_has_many_links() {
    let registry = person_registry();
    let mut query = registry.select("TestPerson").unwrap();
    query
        .link(&registry, "TestPet", LinkOptions::default())
        .unwrap();
    query.add_where("Pets.Type", "cat");
    let pets = "SELECT `X`.* FROM `TestPerson` AS `X`\n\
        INNER JOIN `TestPersonPet` AS `Pets_Link_join` ON `Pets_Link_join`.`Person`=`X`.`PersonID`\n\
        INNER JOIN `TestPet` AS `Pets` ON `Pets_Link_join`.`Pet`=`Pets`.`PetID`\n\
        WHERE `Pets`.`Type` = 'cat'";
    assert_eq!(sql(&query), pets);

    query
        .link(&registry, "TestPet", LinkOptions::default())
        .unwrap();
    assert_eq!(sql(&query), pets);

    query
        .link(&registry, "TestPerson", LinkOptions::default())
        .unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `TestPerson` AS `X`\n\
         INNER JOIN `TestPersonPet` AS `Pets_Link_join` ON `Pets_Link_join`.`Person`=`X`.`PersonID`\n\
         INNER JOIN `TestPet` AS `Pets` ON `Pets_Link_join`.`Pet`=`Pets`.`PetID`\n\
         INNER JOIN `TestPerson` AS `Children` ON `Children`.`Parent`=`X`.`PersonID`\n\
         WHERE `Pets`.`Type` = 'cat'"
    );
}

#[test]
fn test_walk_with_instance_filters_by_owner() {
    let registry = person_registry();
    let person = Record::new("TestPerson").with_id(7_i64);
    let mut query = registry.select("TestPerson").unwrap();
    LinkWalker::new(&registry)
        .with_instance(&person)
        .walk(&mut query, &LinkOptions::path("Pets").on("Type", "dog"))
        .unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `TestPerson` AS `X`\n\
         INNER JOIN `TestPersonPet` AS `Pets_Link_join` ON `Pets_Link_join`.`Person`=`X`.`PersonID`\n\
         INNER JOIN `TestPet` AS `Pets` ON `Pets_Link_join`.`Pet`=`Pets`.`PetID` AND `Pets`.`Type`='dog'\n\
         WHERE `Pets_Link_join`.`Person` = 7"
    );
}

#[test]
fn test_walk_direct_member_filters_target_by_owner() {
    let registry = person_registry();
    let person = Record::new("TestPerson").with_id(7_i64);
    let mut query = registry.select("TestPerson").unwrap();
    LinkWalker::new(&registry)
        .with_instance(&person)
        .walk(&mut query, &LinkOptions::path("Children"))
        .unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `TestPerson` AS `X`\n\
         INNER JOIN `TestPerson` AS `Children` ON `Children`.`Parent`=`X`.`PersonID`\n\
         WHERE `Children`.`Parent` = 7"
    );
}

#[test]
fn test_dynamic_has_one_reads_instance() {
    let registry = site_registry();
    registry.declare(
        ClassDeclaration::new("TestComment")
            .id_column(id("ID"))
            .column("SubjectClass", MemberType::String)
            .has_one("Subject", "*SubjectClass"),
    );
    let comment = Record::new("TestComment").with_member("SubjectClass", "TestSite");
    let mut query = registry.select("TestComment").unwrap();
    LinkWalker::new(&registry)
        .with_instance(&comment)
        .walk(&mut query, &LinkOptions::path("Subject"))
        .unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `X`.* FROM `TestComment` AS `X`\n\
         INNER JOIN `Test_Site` AS `Subject` ON `Subject`.`ID`=`X`.`Subject`"
    );
    let mut query = registry.select("TestComment").unwrap();
    assert!(LinkWalker::new(&registry)
        .walk(&mut query, &LinkOptions::path("Subject"))
        .is_err());
}

#[test]
fn test_missing_link_class() {
    let registry = person_registry();
    registry.declare(
        ClassDeclaration::new("TestOwner")
            .has_many("Cars", HasManySpec::new("TestPet").link_class("TestOwnerCar")),
    );
    let owner = Record::new("TestOwner").with_id(1_i64);
    let err = member_query(&registry, &owner, "Cars").unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, OrmError::ClassNotFound { .. }));
    assert!(message.contains("TestOwnerCar"), "{message}");
    assert!(message.contains("TestOwner'"), "{message}");
}

#[test]
fn test_deferred_link() {
    let registry = person_registry();
    registry
        .link_many(
            "TestPet",
            "Owners",
            HasManySpec::new("TestPerson")
                .link_class("TestPersonPet")
                .foreign_key("Pet")
                .far_key("Person")
                .order_by("Name"),
        )
        .unwrap();
    let pet = Record::new("TestPet").with_id(3_i64);
    let query = member_query(&registry, &pet, "Owners").unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `Owners`.* FROM `TestPerson` AS `Owners`\n\
         INNER JOIN `TestPersonPet` AS `Owners_join` ON `Owners_join`.`Person`=`Owners`.`PersonID`\n\
         WHERE `Owners_join`.`Pet` = 3\n\
         ORDER BY `Owners_join`.`Name`"
    );
}

#[test]
fn test_has_many_where_is_appended() {
    let registry = person_registry();
    registry
        .link_many(
            "TestPerson",
            "Cats",
            HasManySpec::new("TestPet")
                .table("TestPersonPet")
                .foreign_key("Person")
                .far_key("Pet")
                .where_eq("Cats.Type", "cat"),
        )
        .unwrap();
    let person = Record::new("TestPerson").with_id(1_i64);
    let query = member_query(&registry, &person, "Cats").unwrap();
    assert_eq!(
        sql(&query),
        "SELECT `Cats`.* FROM `TestPet` AS `Cats`\n\
         INNER JOIN `TestPersonPet` AS `Cats_join` ON `Cats_join`.`Pet`=`Cats`.`PetID`\n\
         WHERE `Cats_join`.`Person` = 1 AND `Cats`.`Type` = 'cat'"
    );
}

#[test]
fn test_concurrent_class_builds_share_metadata() {
    let registry = person_registry();
    let built: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.class("TestPerson").unwrap()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    assert!(built.iter().all(|base| Arc::ptr_eq(base, &built[0])));

    let resolved: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let base = registry.class("TestPerson").unwrap();
                    base.has_many(&registry, "Pets").unwrap().cloned().unwrap()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    assert!(resolved.iter().all(|many| many == &resolved[0]));
    assert_eq!(resolved[0].table.as_deref(), Some("TestPersonPet"));
    assert_eq!(resolved[0].far_key, "Pet");
}
