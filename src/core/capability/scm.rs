use super::SourceSync;
use crate::address::Address;
use crate::channel::{Channel, Command};
use crate::error::Result;

/// Plain bulk copy. The default when no scm is declared.
#[derive(Debug, Clone, Copy)]
pub struct Rsync;

#[derive(Debug, Clone, Copy)]
pub struct Git;

#[derive(Debug, Clone, Copy)]
pub struct Mercurial;

#[derive(Debug, Clone, Copy)]
pub struct Subversion;

fn rsync_source(source: &Address) -> String {
    let target = source.rsync_target();
    if target.ends_with('/') {
        target
    } else {
        format!("{}/", target)
    }
}

impl SourceSync for Rsync {
    fn name(&self) -> &'static str {
        "rsync"
    }

    /// The source may only be reachable from this machine.
    fn fetches_on_destination(&self) -> bool {
        false
    }

    fn download(&self, ch: &mut dyn Channel, source: &Address, path: &str) -> Result<()> {
        ch.run(Command::new("rsync").args(["-a".to_string(), rsync_source(source), path.to_string()]))
    }

    fn update(&self, ch: &mut dyn Channel, source: &Address) -> Result<()> {
        ch.run(Command::new("rsync").args([
            "-a".to_string(),
            "--delete-after".to_string(),
            rsync_source(source),
            ".".to_string(),
        ]))
    }
}

impl SourceSync for Git {
    fn name(&self) -> &'static str {
        "git"
    }

    fn download(&self, ch: &mut dyn Channel, source: &Address, path: &str) -> Result<()> {
        ch.run(
            Command::new("git")
                .args(["clone", "--depth", "1"])
                .arg(source.to_string())
                .arg(path),
        )
    }

    fn update(&self, ch: &mut dyn Channel, _source: &Address) -> Result<()> {
        ch.run(Command::new("git").args(["reset", "--hard", "HEAD"]))?;
        ch.run(Command::new("git").arg("pull"))
    }

    fn exclude_patterns(&self) -> &'static [&'static str] {
        &[".git", ".gitignore"]
    }
}

impl SourceSync for Mercurial {
    fn name(&self) -> &'static str {
        "mercurial"
    }

    fn download(&self, ch: &mut dyn Channel, source: &Address, path: &str) -> Result<()> {
        ch.run(Command::new("hg").arg("clone").arg(source.to_string()).arg(path))
    }

    fn update(&self, ch: &mut dyn Channel, _source: &Address) -> Result<()> {
        ch.run(Command::new("hg").arg("pull"))?;
        ch.run(Command::new("hg").args(["update", "-C"]))
    }

    fn exclude_patterns(&self) -> &'static [&'static str] {
        &[".hg"]
    }
}

impl SourceSync for Subversion {
    fn name(&self) -> &'static str {
        "subversion"
    }

    fn download(&self, ch: &mut dyn Channel, source: &Address, path: &str) -> Result<()> {
        ch.run(Command::new("svn").arg("checkout").arg(source.to_string()).arg(path))
    }

    fn update(&self, ch: &mut dyn Channel, _source: &Address) -> Result<()> {
        ch.run(Command::new("svn").arg("update"))
    }

    fn exclude_patterns(&self) -> &'static [&'static str] {
        &[".svn"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{RemoteChannel, Transport};
    use crate::utils::command::CommandOutput;

    struct Unused;
    impl Transport for Unused {
        fn execute(&self, _: &Address, _: &str) -> Result<CommandOutput> {
            unreachable!()
        }
    }

    fn record(f: impl FnOnce(&mut dyn Channel) -> Result<()>) -> String {
        let dest = Address::parse("deploy@www.example.com:/srv/app").unwrap();
        let transport = Unused;
        let mut ch = RemoteChannel::new(dest, &transport);
        f(&mut ch).unwrap();
        ch.join()
    }

    #[test]
    fn git_clones_shallow_and_resets_before_pull() {
        let source = Address::parse("git@github.com:user/app.git").unwrap();
        assert_eq!(
            record(|ch| Git.download(ch, &source, "/srv/app")),
            "git clone --depth 1 git@github.com:user/app.git /srv/app"
        );
        assert_eq!(
            record(|ch| Git.update(ch, &source)),
            "git reset --hard HEAD && git pull"
        );
    }

    #[test]
    fn mercurial_and_subversion_commands() {
        let source = Address::parse("https://hg.example.com/app").unwrap();
        assert_eq!(
            record(|ch| Mercurial.update(ch, &source)),
            "hg pull && hg update -C"
        );
        assert_eq!(
            record(|ch| Subversion.download(ch, &source, "app")),
            "svn checkout https://hg.example.com/app app"
        );
        assert_eq!(record(|ch| Subversion.update(ch, &source)), "svn update");
    }

    #[test]
    fn rsync_copies_directory_contents() {
        let source = Address::parse("deploy@build.example.com:/builds/app").unwrap();
        assert_eq!(
            record(|ch| Rsync.download(ch, &source, "/srv/app")),
            "rsync -a deploy@build.example.com:/builds/app/ /srv/app"
        );
        assert_eq!(
            record(|ch| Rsync.update(ch, &source)),
            "rsync -a --delete-after deploy@build.example.com:/builds/app/ ."
        );
    }

    #[test]
    fn only_rsync_stays_on_this_machine() {
        assert!(!Rsync.fetches_on_destination());
        assert!(Git.fetches_on_destination());
        assert!(Mercurial.fetches_on_destination());
        assert!(Subversion.fetches_on_destination());
    }

    #[test]
    fn exclude_patterns_per_scm() {
        assert!(Rsync.exclude_patterns().is_empty());
        assert_eq!(Git.exclude_patterns(), &[".git", ".gitignore"]);
        assert_eq!(Mercurial.exclude_patterns(), &[".hg"]);
        assert_eq!(Subversion.exclude_patterns(), &[".svn"]);
    }
}
