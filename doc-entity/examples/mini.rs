use doc_entity::{
    DocModel, Error, FieldMap, LogicalFilter, MetadataStore, ReadFields, SchemaBuilder, Selector,
    SelectorFilter, SelectorOp, UpdateOps, UpdateFields, filter_to_json, read_fields_to_json,
    update_fields_to_json, wire,
};

#[derive(DocModel, Debug)]
pub struct Address {
    #[field(max_length = 64)]
    pub city: String,
}

#[derive(DocModel, Debug)]
#[collection(name = "users")]
pub struct UserInfo {
    #[field]
    #[primary_key(order = 1, auto_generate)]
    pub id: i64,

    #[field(max_length = 32, sort)]
    pub name: String,

    #[field]
    pub age: i32,

    #[field(model = Address)]
    pub address: Address,

    #[field(generated = "now", timestamp = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let store = MetadataStore::from_inventory()?;
    let tree = SchemaBuilder::new(&store).collection_schema(UserInfo::type_path())?;
    println!("{}", wire::collection_schema("users", &tree)?);

    let filter = LogicalFilter::and()
        .selector(Selector::new().eq("name", "Alice"))
        .selector(SelectorFilter::new(SelectorOp::Gte, Selector::new().eq("age", 25)))
        .selector(Selector::new().nested("address", Selector::new().eq("city", "Paris")));
    println!("{}", filter_to_json(&filter.into())?);

    let update: UpdateFields = UpdateOps::new()
        .set("name", "Alice")
        .increment("age", 1)
        .into();
    println!("{}", update_fields_to_json(&update)?);
    println!(
        "{}",
        update_fields_to_json(&FieldMap::new().with("age", 26).into())?
    );

    let read_fields = ReadFields::new().include("id").include("name").exclude("age");
    println!("{}", read_fields_to_json(&read_fields)?);

    Ok(())
}
