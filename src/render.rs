//! Action rendering into `flatpak` and `ostree` invocations
//!
//! An [`Action`] says what must change; this module decides which host
//! commands make that change. Nothing here runs a process.

use anyhow::{Context, Result};
use flatpakkit::{GPG_KEY_ATTRIBUTE, Installation, Invocation};
use reconcile::compose::MANAGED_CORE_PREFIX;
use reconcile::{
    Action, Application, CoreSettings, Environment, InstallationType, OverrideScope, Permission,
    RemoteAttributes, flags,
};
use std::path::{Path, PathBuf};

/// Remote attribute marking a whole remote rather than some of its keys
const URL_ATTRIBUTE: &str = "url";

/// How a remote attribute maps onto `flatpak remote-add`/`remote-modify` options
enum RemoteOption {
    /// `--name=VALUE`
    Value(&'static str),
    /// A boolean with one option per value; `default` is what remote-add assumes
    Toggle {
        when_true: &'static str,
        when_false: &'static str,
        default: bool,
    },
}

const REMOTE_OPTIONS: &[(&str, RemoteOption)] = &[
    ("xa.title", RemoteOption::Value("--title")),
    ("xa.comment", RemoteOption::Value("--comment")),
    ("xa.description", RemoteOption::Value("--description")),
    ("xa.homepage", RemoteOption::Value("--homepage")),
    ("xa.icon", RemoteOption::Value("--icon")),
    ("xa.default-branch", RemoteOption::Value("--default-branch")),
    ("xa.filter", RemoteOption::Value("--filter")),
    ("xa.prio", RemoteOption::Value("--prio")),
    ("collection-id", RemoteOption::Value("--collection-id")),
    (
        "gpg-verify",
        RemoteOption::Toggle {
            when_true: "--gpg-verify",
            when_false: "--no-gpg-verify",
            default: true,
        },
    ),
    (
        "xa.noenumerate",
        RemoteOption::Toggle {
            when_true: "--no-enumerate",
            when_false: "--enumerate",
            default: false,
        },
    ),
    (
        "xa.nodeps",
        RemoteOption::Toggle {
            when_true: "--no-use-for-deps",
            when_false: "--use-for-deps",
            default: false,
        },
    ),
    (
        "xa.disable",
        RemoteOption::Toggle {
            when_true: "--disable",
            when_false: "--enable",
            default: false,
        },
    ),
];

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Whether the option is needed when adding, and its spelling
enum Mapped {
    Option(Option<String>),
    Unmapped,
}

fn map_remote_option(key: &str, value: &str, adding: bool) -> Mapped {
    let Some((_, option)) = REMOTE_OPTIONS.iter().find(|(k, _)| *k == key) else {
        return Mapped::Unmapped;
    };
    match option {
        RemoteOption::Value(name) => Mapped::Option(Some(format!("{name}={value}"))),
        RemoteOption::Toggle {
            when_true,
            when_false,
            default,
        } => match parse_bool(value) {
            Some(b) if adding && b == *default => Mapped::Option(None),
            Some(true) => Mapped::Option(Some((*when_true).to_string())),
            Some(false) => Mapped::Option(Some((*when_false).to_string())),
            None => Mapped::Unmapped,
        },
    }
}

/// Commands for one action, plus anything that could not be expressed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    pub commands: Vec<Invocation>,
    pub warnings: Vec<String>,
}

impl Rendered {
    fn push(&mut self, command: Invocation) {
        self.commands.push(command);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Renders actions against known repo locations
pub struct Renderer {
    user_repo: PathBuf,
    system_repo: PathBuf,
}

impl Renderer {
    pub fn new(user_repo: impl Into<PathBuf>, system_repo: impl Into<PathBuf>) -> Self {
        Self {
            user_repo: user_repo.into(),
            system_repo: system_repo.into(),
        }
    }

    /// Renderer for this host's default installations
    pub fn for_host() -> Result<Self> {
        let repo = |installation: Installation| {
            installation
                .default_dir()
                .map(|dir| dir.join("repo"))
                .with_context(|| format!("Cannot locate the {installation} installation"))
        };
        let user = repo(Installation::User)?;
        Ok(Self::new(user, repo(Installation::System)?))
    }

    fn repo(&self, t: InstallationType) -> &Path {
        match t {
            InstallationType::User => &self.user_repo,
            InstallationType::System => &self.system_repo,
        }
    }

    fn ostree_config(&self, t: InstallationType) -> Invocation {
        Invocation::ostree()
            .arg("config")
            .arg(format!("--repo={}", self.repo(t).display()))
    }

    /// Render one action
    pub fn render(&self, action: &Action) -> Rendered {
        let mut out = Rendered::default();
        match action {
            Action::AddEnvironment { environment } => self.add_environment(environment, &mut out),
            Action::UpdateEnvironment { environment } => {
                self.set_core(environment, &mut out);
                for (name, attributes) in &environment.remotes {
                    self.modify_remote(environment.installation_type, name, attributes, &mut out);
                }
            }
            Action::RemoveEnvironment { environment } => {
                self.remove_environment(environment, &mut out);
            }
            Action::InstallApplication { application } => install(application, &mut out),
            Action::UninstallApplication { application } => out.push(
                Invocation::flatpak()
                    .arg("uninstall")
                    .arg(type_flag(application.installation_type))
                    .args(["--assumeyes", "--noninteractive"])
                    .arg(app_ref(application)),
            ),
            Action::GrantOverrides {
                application,
                scope,
                flags,
            } => out.push(override_command(application, *scope, flags)),
            Action::RevokeOverrides {
                application,
                scope,
                flags,
            } => revoke_overrides(application, *scope, flags, &mut out),
            Action::GrantPermission {
                application,
                permission,
            } => out.push(permission_set(application, permission)),
            Action::RevokePermission {
                application,
                permission,
            } => out.push(
                Invocation::flatpak()
                    .arg("permission-remove")
                    .args([&permission.table, &permission.object, &application.name]),
            ),
        }
        out
    }

    fn add_environment(&self, env: &Environment, out: &mut Rendered) {
        let t = env.installation_type;
        self.set_core(env, out);
        for (name, attributes) in &env.remotes {
            match attributes.get(URL_ATTRIBUTE) {
                Some(url) => self.add_remote(t, name, url, attributes, out),
                None => self.modify_remote(t, name, attributes, out),
            }
        }
    }

    fn add_remote(
        &self,
        t: InstallationType,
        name: &str,
        url: &str,
        attributes: &RemoteAttributes,
        out: &mut Rendered,
    ) {
        let mut add = Invocation::flatpak()
            .arg("remote-add")
            .arg(type_flag(t))
            .arg("--if-not-exists");
        let mut extra = Vec::new();

        for (key, value) in attributes {
            if key == URL_ATTRIBUTE {
                continue;
            }
            if key == GPG_KEY_ATTRIBUTE {
                out.warn(gpg_key_warning(t, name));
                continue;
            }
            match map_remote_option(key, value, true) {
                Mapped::Option(Some(option)) => add = add.arg(option),
                Mapped::Option(None) => {}
                Mapped::Unmapped => extra.push(self.set_remote_key(t, name, key, value)),
            }
        }

        out.push(add.args([name, url]));
        out.commands.extend(extra);
    }

    fn modify_remote(
        &self,
        t: InstallationType,
        name: &str,
        attributes: &RemoteAttributes,
        out: &mut Rendered,
    ) {
        let mut modify = Invocation::flatpak().arg("remote-modify").arg(type_flag(t));
        let mut options = 0;
        let mut extra = Vec::new();

        for (key, value) in attributes {
            if key == GPG_KEY_ATTRIBUTE {
                out.warn(gpg_key_warning(t, name));
                continue;
            }
            if key == URL_ATTRIBUTE {
                modify = modify.arg(format!("--url={value}"));
                options += 1;
                continue;
            }
            match map_remote_option(key, value, false) {
                Mapped::Option(Some(option)) => {
                    modify = modify.arg(option);
                    options += 1;
                }
                Mapped::Option(None) => {}
                Mapped::Unmapped => extra.push(self.set_remote_key(t, name, key, value)),
            }
        }

        if options > 0 {
            out.push(modify.arg(name));
        }
        out.commands.extend(extra);
    }

    fn remove_environment(&self, env: &Environment, out: &mut Rendered) {
        let t = env.installation_type;

        for (name, attributes) in &env.remotes {
            if attributes.contains_key(URL_ATTRIBUTE) {
                out.push(
                    Invocation::flatpak()
                        .arg("remote-delete")
                        .arg(type_flag(t))
                        .arg("--force")
                        .arg(name),
                );
                continue;
            }
            for key in attributes.keys() {
                if key == GPG_KEY_ATTRIBUTE {
                    out.warn(gpg_key_warning(t, name));
                    continue;
                }
                out.push(
                    self.ostree_config(t)
                        .arg("unset")
                        .arg(remote_key(name, key)),
                );
            }
        }

        for key in env.core.keys() {
            match key.strip_prefix(MANAGED_CORE_PREFIX) {
                Some(setting) => out.push(
                    Invocation::flatpak()
                        .arg("config")
                        .arg(type_flag(t))
                        .args(["--unset", setting]),
                ),
                None => out.warn(format!(
                    "Not unsetting repository setting core.{key} of the {t} installation"
                )),
            }
        }
    }

    fn set_core(&self, env: &Environment, out: &mut Rendered) {
        out.commands
            .extend(self.core_commands(env.installation_type, &env.core));
    }

    fn core_commands(&self, t: InstallationType, core: &CoreSettings) -> Vec<Invocation> {
        core.iter()
            .map(|(key, value)| match key.strip_prefix(MANAGED_CORE_PREFIX) {
                Some(setting) => Invocation::flatpak()
                    .arg("config")
                    .arg(type_flag(t))
                    .args(["--set", setting, value]),
                None => self
                    .ostree_config(t)
                    .arg("set")
                    .arg(format!("core.{key}"))
                    .arg(value),
            })
            .collect()
    }

    fn set_remote_key(
        &self,
        t: InstallationType,
        name: &str,
        key: &str,
        value: &str,
    ) -> Invocation {
        self.ostree_config(t)
            .arg("set")
            .arg(remote_key(name, key))
            .arg(value)
    }
}

fn type_flag(t: InstallationType) -> String {
    format!("--{t}")
}

fn app_ref(app: &Application) -> String {
    format!("{}//{}", app.name, app.branch)
}

fn remote_key(remote: &str, key: &str) -> String {
    format!("remote \"{remote}\".{key}")
}

fn gpg_key_warning(t: InstallationType, remote: &str) -> String {
    format!(
        "GPG key of remote '{remote}' ({t}) differs and is not imported"
    )
}

fn install(app: &Application, out: &mut Rendered) {
    out.push(
        Invocation::flatpak()
            .arg("install")
            .arg(type_flag(app.installation_type))
            .args(["--assumeyes", "--noninteractive"])
            .arg(&app.repo)
            .arg(app_ref(app)),
    );
    for scope in OverrideScope::ALL {
        let flags = app.overrides_for(scope);
        if !flags.is_empty() {
            out.push(override_command(app, scope, flags));
        }
    }
    for permission in &app.permissions {
        out.push(permission_set(app, permission));
    }
}

fn override_command(app: &Application, scope: OverrideScope, flags: &[String]) -> Invocation {
    Invocation::flatpak()
        .arg("override")
        .arg(format!("--{scope}"))
        .arg(&app.name)
        .args(flags)
}

/// The override store has no per-key unset; a revoke writes the opposite flag
fn revoke_overrides(
    app: &Application,
    scope: OverrideScope,
    revoked: &[String],
    out: &mut Rendered,
) {
    let mut negated = Vec::with_capacity(revoked.len());
    for flag in revoked {
        match flags::negate(flag) {
            Some(opposite) => negated.push(opposite),
            None => out.warn(format!(
                "Cannot revoke {flag} from {} ({scope}): flatpak has no opposite flag",
                app.name
            )),
        }
    }
    if !negated.is_empty() {
        out.push(override_command(app, scope, &negated));
    }
}

/// `permission-set` takes each granted permission as its own argument
fn permission_set(app: &Application, permission: &Permission) -> Invocation {
    let data = (!permission.data.is_empty()).then(|| format!("--data={}", permission.data));
    let granted = permission
        .permission
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty());
    Invocation::flatpak()
        .arg("permission-set")
        .args(data)
        .args([&permission.table, &permission.object, &app.name])
        .args(granted)
}
