//! Usage lines for a configurable type.

use kvconf::{Configurable, Engine};

/// One line per member: `Name=kind`, optional members in brackets, and
/// positional members marked with their order.
pub fn usage<T: Configurable>(engine: &Engine) -> String {
    let description = engine.descriptors().describe::<T>();
    let mut out = String::new();
    for member in description.members() {
        let mut line = member.names().join("|");
        line.push('=');
        line.push_str(member.kind_hint().as_deref().unwrap_or("..."));
        if !member.is_required() {
            line = format!("[{line}]");
        }
        if let Some(order) = member.order() {
            line = format!("{line} #{order}");
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;
    use std::path::PathBuf;

    #[derive(Default)]
    #[allow(dead_code)]
    struct Serve {
        root: PathBuf,
        port: u16,
        ratio: f32,
        quiet: bool,
        hosts: Vec<String>,
        ports: Vec<u16>,
        level: String,
    }

    impl Configurable for Serve {
        fn describe(members: &mut kvconf::Members<Self>) {
            members.field("Root", |s| &mut s.root).required().position(0);
            members.field("Port", |s| &mut s.port).alias("p");
            members.field("Ratio", |s| &mut s.ratio);
            members.field("Quiet", |s| &mut s.quiet);
            members.list("Hosts", |s| &mut s.hosts);
            members.list("Ports", |s| &mut s.ports).separator(';');
            members.field("Level", |s| &mut s.level).kind("debug/info/warn");
        }
    }

    #[test]
    fn test_usage() {
        insta::assert_snapshot!(usage::<Serve>(&Engine::new()).trim_end(), @r"
        Root=... #0
        [Port|p=int]
        [Ratio=num]
        [Quiet=true/false]
        [Hosts=,]
        [Ports=;<int>]
        [Level=debug/info/warn]
        ");
    }
}
