use facet::Facet;
use facet_form::{Decoder, Values};
use facet_form as form;
use facet_testhelpers::test;

fn values(pairs: &[(&str, &str)]) -> Values {
    pairs.iter().copied().collect()
}

#[test]
fn test_flat_scalars() {
    #[derive(Facet, Debug, PartialEq)]
    struct Person {
        name: String,
        age: u8,
        height: f32,
        initial: char,
        admin: bool,
    }

    let person: Person = facet_form::from_values(&values(&[
        ("name", "Jane"),
        ("age", "42"),
        ("height", "1.75"),
        ("initial", "J"),
        ("admin", "on"),
    ]))
    .unwrap();
    assert_eq!(
        person,
        Person {
            name: "Jane".into(),
            age: 42,
            height: 1.75,
            initial: 'J',
            admin: true,
        }
    );
}

#[test]
fn test_absent_and_empty_values_are_zero() {
    #[derive(Facet, Debug, PartialEq)]
    struct Counts {
        a: i32,
        b: i32,
        c: bool,
        d: String,
    }

    let counts: Counts = facet_form::from_values(&values(&[("b", ""), ("c", "")])).unwrap();
    assert_eq!(
        counts,
        Counts {
            a: 0,
            b: 0,
            c: false,
            d: String::new(),
        }
    );
}

#[test]
fn test_nested_records() {
    #[derive(Facet, Debug, PartialEq)]
    struct Address {
        city: String,
        zip: u32,
    }

    #[derive(Facet, Debug, PartialEq)]
    struct Company {
        name: String,
        address: Address,
    }

    #[derive(Facet, Debug, PartialEq)]
    struct Employee {
        name: String,
        company: Company,
    }

    let employee: Employee = facet_form::from_str(
        "name=Jane&company.name=Acme&company.address.city=Lyon&company.address.zip=69001",
    )
    .unwrap();
    assert_eq!(employee.name, "Jane");
    assert_eq!(employee.company.name, "Acme");
    assert_eq!(
        employee.company.address,
        Address {
            city: "Lyon".into(),
            zip: 69001
        }
    );
}

#[test]
fn test_absent_nested_record_stays_zero() {
    #[derive(Facet, Debug, PartialEq)]
    struct Inner {
        value: u32,
        label: String,
    }

    #[derive(Facet, Debug, PartialEq)]
    struct Outer {
        name: String,
        inner: Inner,
        maybe: Option<Inner>,
    }

    let outer: Outer = facet_form::from_values(&values(&[("name", "x")])).unwrap();
    assert_eq!(
        outer,
        Outer {
            name: "x".into(),
            inner: Inner {
                value: 0,
                label: String::new()
            },
            maybe: None,
        }
    );
}

#[test]
fn test_options_allocate_only_when_set() {
    #[derive(Facet, Debug, PartialEq)]
    struct Inner {
        value: u32,
    }

    #[derive(Facet, Debug, PartialEq)]
    struct Form {
        nickname: Option<String>,
        age: Option<u32>,
        boxed: Option<Box<Inner>>,
        unset: Option<Inner>,
        empty_number: Option<u32>,
    }

    let form: Form = facet_form::from_values(&values(&[
        ("nickname", ""),
        ("age", "7"),
        ("boxed.value", "3"),
        ("empty_number", ""),
    ]))
    .unwrap();
    assert_eq!(form.nickname, Some(String::new()));
    assert_eq!(form.age, Some(7));
    assert_eq!(form.boxed, Some(Box::new(Inner { value: 3 })));
    assert_eq!(form.unset, None);
    assert_eq!(form.empty_number, None);
}

#[test]
fn test_renames() {
    #[derive(Facet, Debug, PartialEq)]
    struct Login {
        #[facet(form::rename = "user-name")]
        user_name: String,
        #[facet(rename = "pw")]
        password: String,
        #[facet(default)]
        #[facet(form::rename = "-")]
        ignored: String,
    }

    let login: Login = facet_form::from_values(&values(&[
        ("user-name", "jane"),
        ("user_name", "wrong"),
        ("pw", "secret"),
        ("ignored", "nope"),
        ("-", "nope"),
    ]))
    .unwrap();
    assert_eq!(
        login,
        Login {
            user_name: "jane".into(),
            password: "secret".into(),
            ignored: String::new(),
        }
    );
}

#[test]
fn test_skipped_fields_use_their_default() {
    #[derive(Facet, Debug, PartialEq)]
    struct Form {
        name: String,
        #[facet(skip_deserializing, default)]
        retries: u32,
    }

    let form: Form =
        facet_form::from_values(&values(&[("name", "a"), ("retries", "9")])).unwrap();
    assert_eq!(
        form,
        Form {
            name: "a".into(),
            retries: 0
        }
    );
}

#[test]
fn test_custom_namespace_separators() {
    #[derive(Facet, Debug, PartialEq)]
    struct Inner {
        city: String,
    }

    #[derive(Facet, Debug, PartialEq)]
    struct Outer {
        address: Inner,
    }

    let mut decoder = Decoder::new();
    decoder.set_namespace_prefix("[").set_namespace_suffix("]");
    let outer: Outer = decoder
        .decode(&values(&[("address[city]", "Lyon")]), &())
        .unwrap();
    assert_eq!(outer.address.city, "Lyon");
}

#[test]
fn test_unit_enums_by_variant_name() {
    #[derive(Facet, Debug, PartialEq, Default)]
    #[repr(u8)]
    enum Color {
        #[default]
        Red,
        Green,
        #[facet(rename = "deep-blue")]
        Blue,
    }

    #[derive(Facet, Debug, PartialEq)]
    struct Paint {
        primary: Color,
        secondary: Color,
        accent: Option<Color>,
    }

    let paint: Paint = facet_form::from_values(&values(&[
        ("primary", "Green"),
        ("accent", "deep-blue"),
    ]))
    .unwrap();
    assert_eq!(
        paint,
        Paint {
            primary: Color::Green,
            secondary: Color::Red,
            accent: Some(Color::Blue),
        }
    );
}

#[test]
fn test_from_str_scalars() {
    use std::path::PathBuf;

    #[derive(Facet, Debug, PartialEq)]
    struct Upload {
        target: PathBuf,
        backup: Option<PathBuf>,
    }

    let upload: Upload = facet_form::from_str("target=%2Fsrv%2Ffiles").unwrap();
    assert_eq!(upload.target, PathBuf::from("/srv/files"));
    assert_eq!(upload.backup, None);
}

#[test]
fn test_absent_from_str_scalars_parse_from_empty() {
    use std::path::PathBuf;

    #[derive(Facet, Debug, PartialEq)]
    struct Upload {
        name: String,
        target: PathBuf,
        copies: [PathBuf; 2],
    }

    let upload: Upload = facet_form::from_values(&values(&[("name", "x")])).unwrap();
    assert_eq!(
        upload,
        Upload {
            name: "x".into(),
            target: PathBuf::new(),
            copies: [PathBuf::new(), PathBuf::new()],
        }
    );
}

#[test]
fn test_decode_root_collection() {
    let numbers: Vec<u32> = facet_form::from_str("[1]=20&[0]=10").unwrap();
    assert_eq!(numbers, vec![10, 20]);
}
