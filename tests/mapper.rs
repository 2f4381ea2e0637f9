//! Object mapper tests: records, markers, registered converters, maps and
//! the primitive conversion table, driven through the public API.

use std::collections::{BTreeMap, HashMap};

use test_case::test_case;

use easymap::*;

// ── Fixtures ─────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
struct Profile {
    name: String,
    height: f64,
    tags: Vec<String>,
    scratch: i32,
}

record!(#[serialize] Profile { name, height, tags, #[exclude] scratch });

#[derive(Debug, Default, PartialEq)]
struct Team {
    title: String,
    members: Vec<Profile>,
    lead: Option<Box<Profile>>,
}

record!(#[serialize] Team { title, members, lead });

/// Not serializable: only the included field travels.
#[derive(Debug, Default, PartialEq)]
struct Session {
    user: String,
    token: String,
}

record!(Session { #[include] user, token });

#[derive(Debug, Default, PartialEq)]
struct Opaque {
    secret: i32,
}

record!(Opaque { secret });

#[derive(Debug, Default, PartialEq)]
struct Player {
    id: i64,
    name: String,
}

record!(#[serialize] Player { #[key] id, name });

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

record!(#[serialize] Point { x, y });

#[derive(Debug, Default, PartialEq)]
struct Counter {
    label: String,
    count: i32,
}

record!(#[serialize] Counter { label, count });

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Color {
    Red,
    Green,
}

enumeration!(Color { Red, Green });

fn sample_profile() -> Profile {
    Profile {
        name: "p1".into(),
        height: 1.75,
        tags: vec!["a".into(), "b".into()],
        scratch: 99,
    }
}

fn lenient() -> Mapper {
    Mapper::with_options(MapperOptions {
        missing_fields: MissingFieldPolicy::Lenient,
    })
}

// ── Records ──────────────────────────────────────────────────

#[test]
fn record_round_trips_through_text() {
    let mapper = Mapper::new();
    let text = mapper.to_json(&sample_profile(), false).unwrap();
    let back: Profile = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(back, Profile { scratch: 0, ..sample_profile() });
}

#[test]
fn record_export_is_stamped_with_its_type_hash() {
    let data = Mapper::new().to_json_data(&sample_profile(), false).unwrap().unwrap();
    assert_eq!(
        data.get(TYPE_HASH_FIELD).unwrap(),
        Some(&JsonValue::Int(type_hash::<Profile>()))
    );
    assert_eq!(data.string_keys().unwrap(), vec!["name", "height", "tags", TYPE_HASH_FIELD]);
}

#[test]
fn excluded_field_is_absent_and_keeps_its_default() {
    let mapper = Mapper::new();
    let data = mapper.to_json_data(&sample_profile(), false).unwrap().unwrap();
    assert!(!data.contains_key("scratch"));

    let text = r#"{"name":"p2","height":2,"tags":["x"],"scratch":5}"#;
    let back: Profile = mapper.from_json(text, false).unwrap().unwrap();
    assert_eq!(back.scratch, 0);
    assert_eq!(back.height, 2.0);
}

#[test]
fn included_field_travels_on_a_plain_type() {
    let mapper = Mapper::new();
    let session = Session {
        user: "u".into(),
        token: "t".into(),
    };
    let data = mapper.to_json_data(&session, false).unwrap().unwrap();
    assert!(data.contains_key("user"));
    assert!(!data.contains_key("token"));

    let back: Session = mapper.from_json(r#"{"user":"v","token":"w"}"#, false).unwrap().unwrap();
    assert_eq!(back, Session { user: "v".into(), token: String::new() });
}

#[test]
fn record_without_eligible_fields_exports_as_nothing() {
    let mapper = Mapper::new();
    assert_eq!(mapper.to_json_data(&Opaque { secret: 4 }, false).unwrap(), None);
    assert_eq!(mapper.to_json(&Opaque { secret: 4 }, false).unwrap(), "null\n");
}

#[test]
fn force_treats_every_record_as_serializable() {
    let mapper = Mapper::new();
    let data = mapper.to_json_data(&Opaque { secret: 4 }, true).unwrap().unwrap();
    assert_eq!(data.get("secret").unwrap(), Some(&JsonValue::Int(4)));

    let session = Session { user: "u".into(), token: "t".into() };
    let text = mapper.to_json(&session, true).unwrap();
    let back: Session = mapper.from_json(&text, true).unwrap().unwrap();
    assert_eq!(back, session);
}

#[test]
fn nested_records_and_boxes_round_trip() {
    let mapper = Mapper::new();
    let team = Team {
        title: "core".into(),
        members: vec![sample_profile(), Profile { name: "p3".into(), ..Profile::default() }],
        lead: Some(Box::new(Profile { name: "boss".into(), height: 1.9, ..Profile::default() })),
    };
    let text = mapper.to_json(&team, false).unwrap();
    let back: Team = mapper.from_json(&text, false).unwrap().unwrap();

    assert_eq!(back.title, "core");
    assert_eq!(back.members.len(), 2);
    assert_eq!(back.members[0].tags, vec!["a", "b"]);
    assert!(back.members[1].tags.is_empty());
    assert_eq!(back.lead.unwrap().name, "boss");
}

#[test]
fn explicit_null_keeps_the_default_value() {
    let back: Team = Mapper::new()
        .from_json(r#"{"title":"t","members":null,"lead":null}"#, false)
        .unwrap()
        .unwrap();
    assert_eq!(back, Team { title: "t".into(), ..Team::default() });
}

// ── Missing fields ───────────────────────────────────────────

#[test]
fn strict_policy_rejects_a_record_with_a_missing_field() {
    let mapper = Mapper::new();
    assert_eq!(mapper.options().missing_fields, MissingFieldPolicy::Strict);
    let back: Option<Profile> = mapper.from_json(r#"{"name":"p"}"#, false).unwrap();
    assert_eq!(back, None);
}

#[test]
fn lenient_policy_keeps_defaults_for_missing_fields() {
    let back: Profile = lenient().from_json(r#"{"name":"p"}"#, false).unwrap().unwrap();
    assert_eq!(back, Profile { name: "p".into(), ..Profile::default() });
}

#[test]
fn dropped_record_disappears_from_its_sequence() {
    let text = r#"[{"x":1,"y":2},{"x":3}]"#;
    let strict: Vec<Point> = Mapper::new().from_json(text, false).unwrap().unwrap();
    assert_eq!(strict, vec![Point { x: 1, y: 2 }]);
    let relaxed: Vec<Point> = lenient().from_json(text, false).unwrap().unwrap();
    assert_eq!(relaxed, vec![Point { x: 1, y: 2 }, Point { x: 3, y: 0 }]);
}

// ── Registered converters ────────────────────────────────────

fn register_point_text(mapper: &mut Mapper) {
    mapper.register_exporter(|p: &Point| {
        let mut data = JsonValue::object();
        data.insert("xy", JsonValue::from(format!("{},{}", p.x, p.y)))?;
        Ok(Some(data))
    });
    mapper.register_importer::<Point, _>(|value: &JsonValue| {
        let Some(xy) = value.get("xy")? else {
            return Ok(None);
        };
        let text = xy.get_string()?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| JsonError::new(ERR_FORMAT, format!("bad coordinate {:?}", part)))
        };
        match text.split_once(',') {
            Some((x, y)) => Ok(Some(Point { x: parse(x)?, y: parse(y)? })),
            None => Err(JsonError::new(ERR_FORMAT, "expected x,y")),
        }
    });
}

#[test]
fn custom_exporter_replaces_the_field_walk() {
    let mut mapper = Mapper::new();
    register_point_text(&mut mapper);

    let data = mapper.to_json_data(&Point { x: 1, y: -2 }, false).unwrap().unwrap();
    assert_eq!(data.get("xy").unwrap(), Some(&JsonValue::from("1,-2")));
    assert!(!data.contains_key("x"));
    assert_eq!(
        data.get(TYPE_HASH_FIELD).unwrap(),
        Some(&JsonValue::Int(type_hash::<Point>()))
    );
}

#[test]
fn tagged_object_is_routed_to_the_custom_importer() {
    let mut mapper = Mapper::new();
    register_point_text(&mut mapper);

    let points = vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }];
    let text = mapper.to_json(&points, false).unwrap();
    let back: Vec<Point> = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(back, points);
}

#[test]
fn untagged_object_uses_the_field_walk() {
    let mut mapper = Mapper::new();
    register_point_text(&mut mapper);
    let back: Point = mapper.from_json(r#"{"x":5,"y":6}"#, false).unwrap().unwrap();
    assert_eq!(back, Point { x: 5, y: 6 });
}

#[test]
fn tag_wins_over_structurally_shaped_fields() {
    let mut mapper = Mapper::new();
    mapper.register_importer::<Point, _>(|_: &JsonValue| Ok(Some(Point { x: 100, y: 100 })));

    // No exporter: the record is written field by field and stamped.
    let data = mapper.to_json_data(&Point { x: 1, y: 2 }, false).unwrap().unwrap();
    assert_eq!(data.get("x").unwrap(), Some(&JsonValue::Int(1)));
    assert_eq!(
        data.get(TYPE_HASH_FIELD).unwrap(),
        Some(&JsonValue::Int(type_hash::<Point>()))
    );

    let back: Point = mapper.to_object(Some(&data), false).unwrap().unwrap();
    assert_eq!(back, Point { x: 100, y: 100 });

    let text = mapper.to_json(&vec![Point { x: 3, y: 4 }], false).unwrap();
    let list: Vec<Point> = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(list, vec![Point { x: 100, y: 100 }]);
}

#[test]
fn importer_for_another_type_is_a_mismatch() {
    let mut mapper = Mapper::new();
    register_point_text(&mut mapper);
    let data = mapper.to_json_data(&Point { x: 1, y: 2 }, false).unwrap();
    let err = mapper.to_object::<Counter>(data.as_ref(), false).unwrap_err();
    assert_eq!(err.code, ERR_TYPE_MISMATCH);
}

#[test]
fn importer_errors_propagate() {
    let mut mapper = Mapper::new();
    register_point_text(&mut mapper);
    let text = format!(r#"{{"xy":"1;2","@TypeHash":{}}}"#, type_hash::<Point>());
    let err = mapper.from_json::<Point>(&text, false).unwrap_err();
    assert_eq!(err.code, ERR_FORMAT);
}

#[test]
fn first_registration_wins_until_unregistered() {
    let mut mapper = Mapper::new();
    assert!(mapper.register_exporter(|_: &Point| Ok(Some(JsonValue::from("first")))));
    assert!(!mapper.register_exporter(|_: &Point| Ok(Some(JsonValue::from("second")))));
    assert!(mapper.registry().has_exporter::<Point>());
    assert_eq!(
        mapper.to_json_data(&Point::default(), false).unwrap(),
        Some(JsonValue::from("first"))
    );

    assert!(mapper.unregister_exporter::<Point>());
    assert!(!mapper.unregister_exporter::<Point>());
    let data = mapper.to_json_data(&Point::default(), false).unwrap().unwrap();
    assert!(data.contains_key("x"));
}

#[test]
fn scalar_results_are_not_stamped() {
    let mut mapper = Mapper::new();
    mapper.register_exporter(|c: &Color| Ok(Some(JsonValue::from(*c as i32))));
    assert_eq!(mapper.to_json_data(&Color::Green, false).unwrap(), Some(JsonValue::Int(1)));
}

#[test]
fn factory_builds_the_instance_before_import() {
    let mut mapper = lenient();
    assert!(mapper.register_factory(|| Counter { label: "fresh".into(), count: -1 }));
    assert!(mapper.registry().has_factory::<Counter>());

    let back: Counter = mapper.from_json(r#"{"count":3}"#, false).unwrap().unwrap();
    assert_eq!(back, Counter { label: "fresh".into(), count: 3 });

    assert!(mapper.unregister_factory::<Counter>());
    let back: Counter = mapper.from_json(r#"{"count":3}"#, false).unwrap().unwrap();
    assert_eq!(back.label, "");
}

#[test]
fn importer_can_be_unregistered() {
    let mut mapper = Mapper::new();
    register_point_text(&mut mapper);
    assert!(mapper.registry().has_importer::<Point>());
    assert!(mapper.unregister_importer::<Point>());

    let tagged = format!(r#"{{"x":7,"y":8,"@TypeHash":{}}}"#, type_hash::<Point>());
    let back: Point = mapper.from_json(&tagged, false).unwrap().unwrap();
    assert_eq!(back, Point { x: 7, y: 8 });
}

// ── Collections ──────────────────────────────────────────────

#[test]
fn empty_collections_export_as_nothing() {
    let mapper = Mapper::new();
    assert_eq!(mapper.to_json_data(&Vec::<i32>::new(), false).unwrap(), None);
    assert_eq!(mapper.to_json_data(&HashMap::<String, i32>::new(), false).unwrap(), None);
    assert_eq!(mapper.to_json(&BTreeMap::<i32, bool>::new(), false).unwrap(), "null\n");
}

#[test]
fn empty_containers_import_as_empty_collections() {
    let mapper = Mapper::new();
    let list: Vec<i32> = mapper.from_json("[]", false).unwrap().unwrap();
    assert!(list.is_empty());
    let map: HashMap<String, i32> = mapper.from_json("{ }", false).unwrap().unwrap();
    assert!(map.is_empty());
    let nothing: Option<Vec<i32>> = mapper.from_json("null", false).unwrap();
    assert_eq!(nothing, None);
}

#[test]
fn integer_keyed_map_round_trips_through_text() {
    let mapper = Mapper::new();
    let map: HashMap<i32, String> = [(1, "one".to_string()), (-20, "minus".to_string())].into();

    let data = mapper.to_json_data(&map, false).unwrap().unwrap();
    assert!(data.contains_key(1i32));
    assert!(!data.contains_key("1"));

    let text = mapper.to_json(&map, false).unwrap();
    assert!(text.contains("\"-20\" : \"minus\""));
    let back: HashMap<i32, String> = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(back, map);
}

#[test]
fn map_keys_follow_the_value_key_field() {
    let mapper = Mapper::new();
    let roster: BTreeMap<i64, Player> = [
        (7, Player { id: 7, name: "seven".into() }),
        (12, Player { id: 12, name: "twelve".into() }),
    ]
    .into();
    let text = mapper.to_json(&roster, false).unwrap();

    let back: BTreeMap<i64, Player> = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(back, roster);

    // Dynamic keys pick up the key field's type instead of staying text.
    let keyed: indexmap::IndexMap<JsonKey, Player> = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(keyed.keys().cloned().collect::<Vec<_>>(), vec![JsonKey::Int(7), JsonKey::Int(12)]);
}

#[test]
fn key_that_does_not_parse_is_a_format_error() {
    let err = Mapper::new()
        .from_json::<HashMap<i32, bool>>(r#"{"x":true}"#, false)
        .unwrap_err();
    assert_eq!(err.code, ERR_FORMAT);
}

#[test]
fn keys_converging_on_one_native_key_are_rejected() {
    let mapper = Mapper::new();
    let err = mapper
        .from_json::<HashMap<i32, i32>>(r#"{"1":1,"01":2}"#, false)
        .unwrap_err();
    assert_eq!(err.code, ERR_DUP_KEY);
    let err = mapper
        .from_json::<BTreeMap<bool, i32>>(r#"{"true":1,"TRUE":2}"#, false)
        .unwrap_err();
    assert_eq!(err.code, ERR_DUP_KEY);

    let distinct: HashMap<i32, i32> = mapper.from_json(r#"{"1":1,"2":2}"#, false).unwrap().unwrap();
    assert_eq!(distinct.len(), 2);
}

#[test]
fn repeated_text_key_is_a_duplicate_key_error() {
    let err = Mapper::new()
        .from_json::<HashMap<String, i32>>(r#"{"a":1,"a":2}"#, false)
        .unwrap_err();
    assert_eq!(err.code, ERR_DUP_KEY);
}

#[test]
fn map_contents_are_imported_forced() {
    // Opaque has no eligible fields unless forced.
    let back: HashMap<String, Opaque> = Mapper::new()
        .from_json(r#"{"a":{"secret":3}}"#, false)
        .unwrap()
        .unwrap();
    assert_eq!(back["a"], Opaque { secret: 3 });
}

#[test]
fn option_elements_keep_nulls_in_place() {
    let mapper = Mapper::new();
    let kept: Vec<Option<i32>> = mapper.from_json("[1,null,3]", false).unwrap().unwrap();
    assert_eq!(kept, vec![Some(1), None, Some(3)]);
    let dropped: Vec<i32> = mapper.from_json("[1,null,3]", false).unwrap().unwrap();
    assert_eq!(dropped, vec![1, 3]);
}

#[test]
fn enum_keys_travel_as_variant_names() {
    let mapper = Mapper::new();
    let counts: BTreeMap<Color, u16> = [(Color::Red, 1), (Color::Green, 2)].into();
    let text = mapper.to_json(&counts, false).unwrap();
    assert!(text.contains("\"Red\" : 1"));
    let back: BTreeMap<Color, u16> = mapper.from_json(&text, false).unwrap().unwrap();
    assert_eq!(back, counts);
}

// ── Shape and conversion errors ──────────────────────────────

#[test]
fn shape_mismatch_is_unsupported() {
    let mapper = Mapper::new();
    assert_eq!(mapper.from_json::<Vec<i32>>("5", false).unwrap_err().code, ERR_UNSUPPORTED);
    assert_eq!(mapper.from_json::<Point>("[1,2]", false).unwrap_err().code, ERR_UNSUPPORTED);
    assert_eq!(
        mapper.from_json::<HashMap<String, i32>>("[1]", false).unwrap_err().code,
        ERR_UNSUPPORTED
    );
    assert_eq!(mapper.from_json::<i32>("[1]", false).unwrap_err().code, ERR_UNSUPPORTED);
}

#[test]
fn enumeration_rejects_unknown_names_and_other_kinds() {
    let mapper = Mapper::new();
    assert_eq!(mapper.from_json::<Color>("\"Green\"", false).unwrap(), Some(Color::Green));
    assert_eq!(mapper.from_json::<Color>("\"Blue\"", false).unwrap_err().code, ERR_FORMAT);
    assert_eq!(mapper.from_json::<Color>("1", false).unwrap_err().code, ERR_UNSUPPORTED);
}

#[test]
fn malformed_text_surfaces_as_a_parse_error() {
    let err = Mapper::new().from_json::<Point>("{\"x\":", false).unwrap_err();
    assert_eq!(err.code, ERR_PARSE);
}

#[test_case("true", "True" ; "bool to text")]
#[test_case("false", "False" ; "false to text")]
#[test_case("42", "42" ; "int to text")]
#[test_case("9999999999", "9999999999" ; "long to text")]
#[test_case("0.5", "0.5" ; "double to text")]
fn scalars_convert_to_text(input: &str, expected: &str) {
    let text: String = Mapper::new().from_json(input, false).unwrap().unwrap();
    assert_eq!(text, expected);
}

#[test_case("2.5", 2 ; "half rounds down to even")]
#[test_case("3.5", 4 ; "half rounds up to even")]
#[test_case("-2.5", -2 ; "negative half to even")]
#[test_case("true", 1 ; "bool to one")]
#[test_case("\" 17 \"", 17 ; "trimmed text")]
fn scalars_convert_to_int(input: &str, expected: i32) {
    let value: i32 = Mapper::new().from_json(input, false).unwrap().unwrap();
    assert_eq!(value, expected);
}

#[test_case("0", false ; "zero")]
#[test_case("-3", true ; "non zero")]
#[test_case("\"TRUE\"", true ; "text ignores case")]
#[test_case("\" false \"", false ; "text is trimmed")]
fn scalars_convert_to_bool(input: &str, expected: bool) {
    let value: bool = Mapper::new().from_json(input, false).unwrap().unwrap();
    assert_eq!(value, expected);
}

#[test]
fn narrowing_out_of_range_overflows() {
    let mapper = Mapper::new();
    assert_eq!(mapper.from_json::<u8>("300", false).unwrap_err().code, ERR_OVERFLOW);
    assert_eq!(mapper.from_json::<i32>("9999999999", false).unwrap_err().code, ERR_OVERFLOW);
    assert_eq!(mapper.from_json::<u16>("-1", false).unwrap_err().code, ERR_OVERFLOW);
    assert_eq!(mapper.from_json::<i8>("\"1000\"", false).unwrap_err().code, ERR_OVERFLOW);
    assert_eq!(mapper.from_json::<f32>("1e300", false).unwrap_err().code, ERR_OVERFLOW);
}

#[test]
fn unparsable_text_is_a_format_error() {
    let mapper = Mapper::new();
    assert_eq!(mapper.from_json::<i32>("\"abc\"", false).unwrap_err().code, ERR_FORMAT);
    assert_eq!(mapper.from_json::<bool>("\"yes\"", false).unwrap_err().code, ERR_FORMAT);
    assert_eq!(mapper.from_json::<f64>("\"1.2.3\"", false).unwrap_err().code, ERR_FORMAT);
    assert_eq!(mapper.from_json::<char>("\"ab\"", false).unwrap_err().code, ERR_FORMAT);
}

#[test]
fn characters_travel_as_code_points() {
    let mapper = Mapper::new();
    assert_eq!(mapper.to_json(&'A', false).unwrap(), "65\n");
    assert_eq!(mapper.from_json::<char>("65", false).unwrap(), Some('A'));
    assert_eq!(mapper.from_json::<char>("\"z\"", false).unwrap(), Some('z'));
    assert_eq!(mapper.from_json::<char>("true", false).unwrap_err().code, ERR_UNSUPPORTED);
}

#[test]
fn dynamic_values_pass_through_with_tags() {
    let mapper = Mapper::new();
    let tagged = format!(r#"{{"x":1,"@TypeHash":{}}}"#, type_hash::<Point>());
    let value: JsonValue = mapper.from_json(&tagged, false).unwrap().unwrap();
    assert!(value.contains_key(TYPE_HASH_FIELD));
    assert_eq!(mapper.to_json_data(&JsonValue::new(), false).unwrap(), None);
}
