use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use facet::Facet;
use facet_testhelpers::test;

use crate::*;

#[derive(Debug, Default, PartialEq)]
struct Dog {
    color: String,
}

impl Configurable for Dog {
    fn describe(members: &mut Members<Self>) {
        members.field("Color", |dog| &mut dog.color);
    }
}

#[derive(Debug, Default)]
struct Man {
    best_friend: Dog,
}

impl Configurable for Man {
    fn describe(members: &mut Members<Self>) {
        members.field("BestFriend", |man| &mut man.best_friend);
    }
}

trait Pet: Send {
    fn sound(&self) -> &'static str;
}

struct Cat;

impl Pet for Cat {
    fn sound(&self) -> &'static str {
        "meow"
    }
}

impl Value for Box<dyn Pet> {}

#[derive(Default)]
struct Kid {
    pet: Option<Box<dyn Pet>>,
}

impl Configurable for Kid {
    fn describe(members: &mut Members<Self>) {
        members.field("Pet", |kid| &mut kid.pet);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Mom {
    jobs: Vec<String>,
}

impl Configurable for Mom {
    fn describe(members: &mut Members<Self>) {
        members.list("Jobs", |mom| &mut mom.jobs);
    }
}

#[derive(Debug, Default)]
struct Resume {
    jobs: Vec<Option<String>>,
}

impl Configurable for Resume {
    fn describe(members: &mut Members<Self>) {
        members.list("Jobs", |resume| &mut resume.jobs);
    }
}

#[derive(Debug, Default)]
struct NumContainer {
    nums: Vec<f64>,
}

impl Configurable for NumContainer {
    fn describe(members: &mut Members<Self>) {
        members.list("Nums", |cont| &mut cont.nums);
    }
}

#[derive(Debug, Default)]
struct IntContainer {
    dict: HashMap<String, i32>,
    sorted: BTreeMap<u8, Dog>,
}

impl Configurable for IntContainer {
    fn describe(members: &mut Members<Self>) {
        members.map("Dict", |cont| &mut cont.dict);
        members.map("Sorted", |cont| &mut cont.sorted);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Infant {
    weight: String,
    diaper_size: i32,
    mom: Mom,
}

impl Configurable for Infant {
    fn describe(members: &mut Members<Self>) {
        members.field("Weight", |infant| &mut infant.weight);
        members.field("DiaperSize", |infant| &mut infant.diaper_size);
        members.field("Mom", |infant| &mut infant.mom);
    }
}

const INFANT: &str = "
    Weight = 12.3 lb
    Diaper size = 1
    Mom.Jobs[0] = chef
    Mom.jobs[1] = Nurse
    mom.jobs[2] = accountant
";

#[test]
fn test_converter_configures_from_same_block() {
    let engine = Arc::new(Engine::new());
    engine
        .converters()
        .register::<Dog>(converter_fn::<Dog, _>(|text, conf| {
            conf.configure(Dog::default(), text)
        }));
    let conf = engine.load(
        "
        Penny.color = red
        Man.Best friend = Penny
        ",
    );
    let man = conf.configure_default(Man::default()).unwrap();
    assert_eq!(man.best_friend.color, "red");
}

#[test]
fn test_named_factory_creates_instance() {
    let engine = Arc::new(Engine::new());
    engine
        .types()
        .register::<Box<dyn Pet>, _>("Cat", || -> Box<dyn Pet> { Box::new(Cat) });
    let kid = engine
        .load("Kid.Pet = cat")
        .configure_default(Kid::default())
        .unwrap();
    assert_eq!(kid.pet.map(|pet| pet.sound()), Some("meow"));
}

#[test]
fn test_unregistered_name_fails() {
    let engine = Arc::new(Engine::new());
    let Err(error) = engine
        .load("Kid.Pet = Hamster")
        .configure_default(Kid::default())
    else {
        panic!("a hamster is not a registered pet");
    };
    assert!(matches!(error.kind, ConfErrorKind::NoConversion { .. }), "{error}");
    assert_eq!(error.key.as_deref(), Some("Kid.Pet"));
}

#[test]
fn test_adds_to_list() {
    let conf = Conf::parse(
        "
        Mom.Jobs[0] = chef
        Mom.jobs[1] = Nurse
        mom.jobs[2] = accountant",
    );
    let mom = conf.configure_default(Mom::default()).unwrap();
    assert_eq!(mom.jobs, ["chef", "Nurse", "accountant"]);
}

#[test]
fn test_converts_list_values() {
    let conf = Conf::parse(
        "
        Cont.Nums[0] = 1.23
        Cont.nums[1] = 2.34
        Cont.nums[2] = 3.45",
    );
    let cont = conf.configure(NumContainer::default(), "cont").unwrap();
    assert_eq!(cont.nums, [1.23, 2.34, 3.45]);
}

#[test]
fn test_last_listed_index_wins() {
    let conf = Conf::parse(
        "
        Cont.Nums[0] = 1.23
        Cont.nums[1] = 2.34
        Cont.nums[1] = 2.00
        Cont.nums[2] = 3.45",
    );
    let cont = conf.configure(NumContainer::default(), "cont").unwrap();
    assert_eq!(cont.nums, [1.23, 2.00, 3.45]);
}

#[test]
fn test_list_gaps_get_defaults() {
    let conf = Conf::parse(
        "
        Cont.Nums[0] = 1.23
        Cont.nums[1] = 2.34
        Cont.nums[2] = 3.45
        Cont.nums[5] = 5.67",
    );
    let cont = conf.configure(NumContainer::default(), "cont").unwrap();
    assert_eq!(cont.nums, [1.23, 2.34, 3.45, 0.0, 0.0, 5.67]);
}

#[test]
fn test_list_gaps_get_none() {
    let conf = Conf::parse(
        "
        Mom.Jobs[1] = chef
        Mom.jobs[3] = Nurse
        mom.jobs[7] = accountant",
    );
    let resume = conf.configure(Resume::default(), "mom").unwrap();
    let chef = Some("chef".to_string());
    let nurse = Some("Nurse".to_string());
    let accountant = Some("accountant".to_string());
    assert_eq!(
        resume.jobs,
        [None, chef, None, nurse, None, None, None, accountant]
    );
}

#[test]
fn test_sets_map_values() {
    let conf = Conf::parse(
        "
        cont.Dict[first] = 1
        cont.dict[Third] = 3
        cont.dict[ first ] = 11",
    );
    let cont = conf.configure(IntContainer::default(), "cont").unwrap();
    let expected = HashMap::from([("first".to_string(), 11), ("Third".to_string(), 3)]);
    assert_eq!(cont.dict, expected);
}

#[test]
fn test_map_entries_are_created_for_nested_keys() {
    let conf = Conf::parse("cont.sorted[2].color = red; cont.sorted[1].color = blue");
    let cont = conf.configure(IntContainer::default(), "cont").unwrap();
    let colors = cont
        .sorted
        .iter()
        .map(|(k, dog)| (*k, dog.color.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(colors, [(1, "blue"), (2, "red")]);
}

#[test]
fn test_map_key_must_convert() {
    let conf = Conf::parse("cont.sorted[two].color = red");
    let error = conf.configure(IntContainer::default(), "cont").unwrap_err();
    assert_eq!(error.kind, ConfErrorKind::invalid("two", "int"));
}

#[test]
fn test_configures_without_key() {
    let infant = Conf::parse(INFANT).configure(Infant::default(), "").unwrap();
    assert_eq!(infant.weight, "12.3 lb");
    assert_eq!(infant.diaper_size, 1);
    assert_eq!(infant.mom.jobs[1], "Nurse");
}

#[test]
fn test_value_without_key_is_ignored() {
    let infant = Conf::parse("= 7 lb\nWeight = 8 lb")
        .configure(Infant::default(), "")
        .unwrap();
    assert_eq!(infant.weight, "8 lb");
}

#[test]
fn test_sets_deep_values() {
    let conf = Conf::parse(
        "
        kid.Weight = 12.3 lb
        kid.Diaper size = 1
        kid.Mom.Jobs[0] = chef
        kid.Mom.jobs[1] = Nurse
        kid.mom.jobs[2] = accountant
        ",
    );
    let infant = conf.configure(Infant::default(), "Kid").unwrap();
    assert_eq!(infant.mom.jobs[2], "accountant");
}

#[test]
fn test_dotted_prefix() {
    let conf = Conf::parse("Kennel.Penny.Color = brown; Kennel.Rex.Color = black");
    let dog = conf.configure(Dog::default(), "kennel . penny").unwrap();
    assert_eq!(dog.color, "brown");
}

#[test]
fn test_unknown_keys_are_ignored() {
    let conf = Conf::parse(
        "
        Weight = 3 kg
        Height = 50 cm
        Mom.Hobbies[0] = chess
        Weight.Unit = kg
        Mom.Jobs.Current = chef
        ",
    );
    let infant = conf.configure(Infant::default(), "").unwrap();
    assert_eq!(infant.weight, "3 kg");
    assert!(infant.mom.jobs.is_empty());
}

#[test]
fn test_population_is_repeatable() {
    let conf = Conf::parse(INFANT);
    let first = conf.configure(Infant::default(), "").unwrap();
    let second = conf.configure(Infant::default(), "").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_failure_keeps_earlier_assignments() {
    let conf = Conf::parse("Cont.Nums[0] = 1.5\nCont.Nums[1] = abc\nCont.Nums[2] = 2.5");
    let mut cont = NumContainer::default();
    let error = conf.configure_in_place(&mut cont, "cont").unwrap_err();
    assert_eq!(cont.nums, [1.5]);
    assert_eq!(error.kind, ConfErrorKind::invalid("abc", "num"));
    assert_eq!(error.key.as_deref(), Some("Cont.Nums[1]"));
    assert_eq!(error.span.unwrap().slice(conf.block().source()), "abc");
}

#[derive(Debug, Default)]
struct Owner {
    dog: Option<Dog>,
    age: Option<u8>,
}

impl Configurable for Owner {
    fn describe(members: &mut Members<Self>) {
        members.field("Dog", |owner| &mut owner.dog);
        members.field("Age", |owner| &mut owner.age);
    }
}

#[test]
fn test_optional_members() {
    let owner = Conf::parse("owner.dog.color = grey; owner.age = 40")
        .configure_default(Owner::default())
        .unwrap();
    assert_eq!(owner.dog, Some(Dog { color: "grey".into() }));
    assert_eq!(owner.age, Some(40));

    let owner = Conf::parse("owner.age = 41").configure_default(Owner::default()).unwrap();
    assert_eq!(owner.dog, None);
}

#[derive(Debug, Default)]
struct Vals {
    val3: f64,
}

impl Configurable for Vals {
    fn describe(members: &mut Members<Self>) {
        members.field("val3", |vals| &mut vals.val3);
    }
}

#[test]
fn test_names_ignore_case_and_whitespace() {
    for key in ["val3", "VAL3", "Val 3", "VaL \t3"] {
        let vals = Conf::parse(&format!("{key} = 3.14"))
            .configure(Vals::default(), "")
            .unwrap();
        assert_eq!(vals.val3, 3.14, "{key:?}");
    }
}

#[derive(Debug, Default)]
struct Job {
    title: String,
    salary: f64,
}

impl Configurable for Job {
    fn describe(members: &mut Members<Self>) {
        members.field("Title", |job| &mut job.title);
        members.field("Salary", |job| &mut job.salary);
    }
}

#[test]
fn test_configure_all() {
    let conf = Conf::parse(
        "
        Job[b].Title = chef
        job[a].title = nurse
        job[ b ].salary = 10
        boss.title = none
        ",
    );
    let jobs = conf.configure_all(|_| Job::default(), "job").unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!((jobs[0].title.as_str(), jobs[0].salary), ("chef", 10.0));
    assert_eq!((jobs[1].title.as_str(), jobs[1].salary), ("nurse", 0.0));
}

#[test]
fn test_configure_map_of_values() {
    let conf = Conf::parse("limits.num[x] = 1; limits.num[y] = 2; limits.num[x] = 3");
    let nums = conf.configure_map(|_| 0_i32, "limits.num").unwrap();
    assert_eq!(nums, [("x".to_string(), 3), ("y".to_string(), 2)]);
}

#[test]
fn test_configure_all_converts_whole_values() {
    let engine = Arc::new(Engine::new());
    engine
        .converters()
        .register::<Dog>(converter_fn::<Dog, _>(|text, _| {
            Ok(Dog {
                color: text.to_uppercase(),
            })
        }));
    let conf = engine.load("dog[0] = red\ndog[1].color = blue\ndog[0].color = green");
    let dogs = conf.configure_all(|_| Dog::default(), "dog").unwrap();
    assert_eq!(dogs[0].color, "green");
    assert_eq!(dogs[1].color, "blue");
}

#[test]
fn test_factory_receives_index() {
    let conf = Conf::parse("job[chef].salary = 10; job[ nurse ].salary = 20");
    let jobs = conf
        .configure_all(
            |index| Job {
                title: index.to_string(),
                salary: 0.0,
            },
            "job",
        )
        .unwrap();
    assert_eq!((jobs[0].title.as_str(), jobs[0].salary), ("chef", 10.0));
    assert_eq!((jobs[1].title.as_str(), jobs[1].salary), ("nurse", 20.0));
}

#[test]
fn test_configure_map_by_groups_indices() {
    let conf = Conf::parse(
        "
        job[Chef].salary = 10
        job[CHEF].title = cook
        job[nurse].salary = 20
        ",
    );
    let jobs = conf
        .configure_map_by(|_| Job::default(), "job", str::eq_ignore_ascii_case)
        .unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].0, "Chef");
    assert_eq!((jobs[0].1.title.as_str(), jobs[0].1.salary), ("cook", 10.0));
    assert_eq!(jobs[1].0, "nurse");

    let exact = conf.configure_map(|_| Job::default(), "job").unwrap();
    let indices = exact.iter().map(|(index, _)| index.as_str()).collect::<Vec<_>>();
    assert_eq!(indices, ["Chef", "CHEF", "nurse"]);
}

#[test]
fn test_huge_index_is_refused() {
    let conf = Conf::parse("cont.nums[10000000000] = 1");
    let mut cont = NumContainer::default();
    let error = conf.configure_in_place(&mut cont, "cont").unwrap_err();
    assert_eq!(
        error.kind,
        ConfErrorKind::IndexOutOfRange {
            index: 10_000_000_000,
            max: DEFAULT_MAX_LEN,
        }
    );
    assert_eq!(error.key.as_deref(), Some("cont.nums[10000000000]"));
    assert!(cont.nums.is_empty());
}

#[derive(Debug, Default)]
struct Kennel {
    slots: Vec<u8>,
    dogs: Vec<Dog>,
}

impl Configurable for Kennel {
    fn describe(members: &mut Members<Self>) {
        members.list("Slots", |kennel| &mut kennel.slots).max_len(3);
        members.list("Dogs", |kennel| &mut kennel.dogs).max_len(2);
    }
}

#[test]
fn test_member_length_limit() {
    let mut kennel = Kennel::default();
    Conf::parse("kennel.slots[2] = 7")
        .configure_in_place(&mut kennel, "kennel")
        .unwrap();
    assert_eq!(kennel.slots, [0, 0, 7]);

    let error = Conf::parse("kennel.slots[3] = 1")
        .configure_in_place(&mut kennel, "kennel")
        .unwrap_err();
    assert_eq!(error.kind, ConfErrorKind::IndexOutOfRange { index: 3, max: 3 });
    assert_eq!(error.kind.to_string(), "index 3 is past the limit of 3 elements");

    let error = Conf::parse("kennel.slots = 1")
        .configure_in_place(&mut kennel, "kennel")
        .unwrap_err();
    assert_eq!(error.kind, ConfErrorKind::IndexOutOfRange { index: 3, max: 3 });
    assert_eq!(kennel.slots, [0, 0, 7]);

    let error = Conf::parse("kennel.dogs[1].color = red
kennel.dogs[2].color = blue")
        .configure_in_place(&mut kennel, "kennel")
        .unwrap_err();
    assert_eq!(error.kind, ConfErrorKind::IndexOutOfRange { index: 2, max: 2 });
    assert_eq!(kennel.dogs.len(), 2);
    assert_eq!(kennel.dogs[1].color, "red");
}

#[derive(Debug, Default, Facet)]
struct Tls {
    enabled: bool,
    #[facet(rename = "CertFile")]
    cert: String,
}

#[derive(Debug, Default, Facet)]
struct Server {
    #[facet(kvconf::positional, kvconf::required)]
    host: String,
    #[facet(kvconf::positional)]
    port: u16,
    #[facet(alias = "level")]
    verbosity: Option<u8>,
    #[facet(kvconf::separator = '|')]
    tags: Vec<String>,
    #[facet(kvconf::kind = "attempts")]
    retries: Vec<u32>,
    tls: Tls,
    #[facet(skip)]
    secret: String,
}

crate::configurable!(Server);

const SERVER: &str = "
    server.host = example.org
    server.port = 8080
    server.level = 3
    server.tags = a, b | c
    server.retries[2] = 5
    server.tls.enabled = true
    server.tls.cert file = /etc/cert.pem
    server.secret = hunter2
    server.unknown = 1
";

#[test]
fn test_reflected_members_are_populated() {
    let server = Conf::parse(SERVER)
        .configure_default(Server::default())
        .unwrap();
    assert_eq!(server.host, "example.org");
    assert_eq!(server.port, 8080);
    assert_eq!(server.verbosity, Some(3));
    assert_eq!(server.tags, ["a, b", "c"]);
    assert_eq!(server.retries, [0, 0, 5]);
    assert!(server.tls.enabled);
    assert_eq!(server.tls.cert, "/etc/cert.pem");
    assert_eq!(server.secret, "");
}

#[test]
fn test_reflected_description() {
    let description = DescriptorCache::new().describe::<Server>();
    let positional = description
        .positional()
        .iter()
        .map(|member| member.name())
        .collect::<Vec<_>>();
    assert_eq!(positional, ["host", "port"]);
    assert!(description.find("host").unwrap().is_required());
    assert!(!description.find("port").unwrap().is_required());
    assert_eq!(description.find("level").unwrap().name(), "verbosity");
    assert!(description.find("secret").is_none());

    let tags = description.find("tags").unwrap();
    assert!(tags.is_collection());
    assert_eq!(tags.list_separator(), '|');
    assert_eq!(tags.kind_hint().as_deref(), Some("|"));
    assert_eq!(
        description.find("retries").unwrap().kind_hint().as_deref(),
        Some("attempts")
    );
    assert_eq!(description.find("port").unwrap().kind_hint().as_deref(), Some("int"));
    assert!(!description.find("tls").unwrap().is_collection());
}

#[test]
fn test_reflected_errors_carry_the_key() {
    let mut server = Server::default();
    let error = Conf::parse("server.port = 8080
server.tls.enabled = maybe")
        .configure_in_place(&mut server, "server")
        .unwrap_err();
    assert_eq!(error.kind, ConfErrorKind::invalid("maybe", "true/false"));
    assert_eq!(error.key.as_deref(), Some("server.tls.enabled"));
    assert_eq!(server.port, 8080);

    let error = Conf::parse("server.retries[100000] = 1")
        .configure_in_place(&mut server, "server")
        .unwrap_err();
    assert_eq!(
        error.kind,
        ConfErrorKind::IndexOutOfRange {
            index: 100_000,
            max: DEFAULT_MAX_LEN,
        }
    );
    assert!(server.retries.is_empty());
}

#[test]
fn test_nested_shapes_are_described_once() {
    let engine = Arc::new(Engine::new());
    let conf = engine.load("server.tls.enabled = true
server.tls.certfile = a.pem");
    let server = conf.configure_default(Server::default()).unwrap();
    assert_eq!(server.tls.cert, "a.pem");
    assert_eq!(engine.descriptors().len(), 2);
    let tls = engine.descriptors().describe_shape(Tls::SHAPE);
    assert_eq!(tls.type_name(), "Tls");
    assert_eq!(tls.find("certfile").unwrap().name(), "CertFile");
}

#[derive(Debug, Default, Facet)]
struct Upstream {
    address: String,
    timeout: u32,
}

crate::configurable!(Upstream, |members| {
    members
        .field("Timeout", |upstream| &mut upstream.timeout)
        .alias("Wait")
        .required();
});

#[test]
fn test_builder_overrides_reflected_member() {
    let description = DescriptorCache::new().describe::<Upstream>();
    assert_eq!(description.members().len(), 2);
    let timeout = description.find("wait").unwrap();
    assert_eq!(timeout.names(), ["Timeout", "Wait"]);
    assert!(timeout.is_required());

    let upstream = Conf::parse("upstream.address = 10.0.0.1
upstream.wait = 30")
        .configure_default(Upstream::default())
        .unwrap();
    assert_eq!(upstream.address, "10.0.0.1");
    assert_eq!(upstream.timeout, 30);
}

#[derive(Default)]
struct Shout;

impl Converter for Shout {
    fn convert(&self, text: &str, _conf: &Conf) -> Result<Box<dyn std::any::Any + Send>, ConfError> {
        Ok(Box::new(text.to_uppercase()))
    }
}

#[derive(Debug, Default)]
struct Sign {
    text: String,
    words: Vec<String>,
    ports: Vec<u16>,
    tags: Vec<String>,
}

impl Configurable for Sign {
    fn describe(members: &mut Members<Self>) {
        members.field("Text", |sign| &mut sign.text).converter::<Shout>();
        members.list("Words", |sign| &mut sign.words).converter::<Shout>();
        members.list("Ports", |sign| &mut sign.ports);
        members.list("Tags", |sign| &mut sign.tags).separator('|');
    }
}

#[test]
fn test_member_converter() {
    let sign = Conf::parse("sign.text = hello there; sign.words[1] = b")
        .configure_default(Sign::default())
        .unwrap();
    assert_eq!(sign.text, "HELLO THERE");
    assert_eq!(sign.words, ["", "B"]);
}

#[test]
fn test_list_items_form() {
    let conf = Conf::parse(
        "
        sign.ports = 80, 443,
        sign.ports = 8080
        sign.tags = a, b | c
        sign.words = x, y
        ",
    );
    let sign = conf.configure_default(Sign::default()).unwrap();
    assert_eq!(sign.ports, [80, 443, 8080]);
    assert_eq!(sign.tags, ["a, b", "c"]);
    assert_eq!(sign.words, ["X", "Y"]);
}

#[test]
fn test_list_items_fail_as_a_whole() {
    let conf = Conf::parse("sign.ports = 80, http");
    let mut sign = Sign::default();
    let error = conf.configure_in_place(&mut sign, "sign").unwrap_err();
    assert_eq!(error.kind, ConfErrorKind::invalid("http", "int"));
    assert!(sign.ports.is_empty());
}

#[test]
fn test_converter_instances_are_shared() {
    let engine = Arc::new(Engine::new());
    let first = engine.converters().instance::<Shout>();
    let second = engine.converters().instance::<Shout>();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_engine_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
    assert_send_sync::<Conf>();
}
