use rollout_core::{BuildConfig, DescriptorVariant};

/// The binary a container runs and the address it binds inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBinary {
    pub name: String,
    pub bind_host: String,
    pub port: u16,
}

impl ServiceBinary {
    pub fn new(name: &str, bind_host: &str, port: u16) -> Self {
        Self {
            name: name.to_owned(),
            bind_host: bind_host.to_owned(),
            port,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// `<service> --bind <host>:<port>`
    pub fn command(&self) -> Vec<String> {
        vec![self.name.clone(), "--bind".to_owned(), self.bind_address()]
    }
}

/// A file copy into a stage, optionally out of an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRule {
    pub from_stage: Option<String>,
    pub src: String,
    pub dest: String,
}

impl CopyRule {
    fn context(src: &str, dest: &str) -> Self {
        Self {
            from_stage: None,
            src: src.to_owned(),
            dest: dest.to_owned(),
        }
    }

    fn from_stage(stage: &str, src: &str, dest: &str) -> Self {
        Self {
            from_stage: Some(stage.to_owned()),
            src: src.to_owned(),
            dest: dest.to_owned(),
        }
    }
}

/// One `FROM` block of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStage {
    pub name: Option<String>,
    pub base_image: String,
    pub workdir: Option<String>,
    /// System packages installed with apt-get before anything is copied
    pub packages: Vec<String>,
    pub copies: Vec<CopyRule>,
    pub run: Vec<String>,
    /// Sorted by key so rendering is deterministic
    pub env: Vec<(String, String)>,
    pub expose: Option<u16>,
    pub command: Vec<String>,
}

/// Ordered stages producing a runnable service image.
///
/// Both variants end in a stage that exposes the service port and runs
/// `<service> --bind <host>:<port>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    pub variant: DescriptorVariant,
    pub stages: Vec<BuildStage>,
}

const BUILDER_STAGE: &str = "builder";
const INSTALL_DIR: &str = "/usr/local/bin";

impl BuildDescriptor {
    pub fn new(variant: DescriptorVariant, config: &BuildConfig, service: &ServiceBinary) -> Self {
        match variant {
            DescriptorVariant::MultiStage => Self::multi_stage(config, service),
            DescriptorVariant::SingleStage => Self::single_stage(config, service),
        }
    }

    /// Compile in the builder image; ship only the binary on the runtime image.
    pub fn multi_stage(config: &BuildConfig, service: &ServiceBinary) -> Self {
        let workdir = source_dir(service);
        let builder = BuildStage {
            name: Some(BUILDER_STAGE.to_owned()),
            base_image: config.base_image.clone(),
            workdir: Some(workdir.clone()),
            packages: config.extra_packages.clone(),
            copies: vec![CopyRule::context(".", ".")],
            run: vec![cargo_build(config, service)],
            ..Default::default()
        };
        let runtime = BuildStage {
            base_image: config.runtime_image.clone(),
            copies: vec![CopyRule::from_stage(
                BUILDER_STAGE,
                &format!("{workdir}/target/release/{}", service.name),
                &format!("{INSTALL_DIR}/{}", service.name),
            )],
            env: sorted_env(config),
            expose: Some(service.port),
            command: service.command(),
            ..Default::default()
        };

        Self {
            variant: DescriptorVariant::MultiStage,
            stages: vec![builder, runtime],
        }
    }

    /// Compile and run in the builder image.
    pub fn single_stage(config: &BuildConfig, service: &ServiceBinary) -> Self {
        let stage = BuildStage {
            base_image: config.base_image.clone(),
            workdir: Some(source_dir(service)),
            packages: config.extra_packages.clone(),
            copies: vec![CopyRule::context(".", ".")],
            run: vec![format!(
                "{build} && cp target/release/{bin} {INSTALL_DIR}/{bin}",
                build = cargo_build(config, service),
                bin = service.name,
            )],
            env: sorted_env(config),
            expose: Some(service.port),
            command: service.command(),
            ..Default::default()
        };

        Self {
            variant: DescriptorVariant::SingleStage,
            stages: vec![stage],
        }
    }

    /// The stage the image is run from.
    pub fn final_stage(&self) -> Option<&BuildStage> {
        self.stages.last()
    }

    pub fn exposed_port(&self) -> Option<u16> {
        self.final_stage().and_then(|s| s.expose)
    }

    pub fn command(&self) -> &[String] {
        self.final_stage().map_or(&[], |s| s.command.as_slice())
    }
}

fn source_dir(service: &ServiceBinary) -> String {
    format!("/usr/src/{}", service.name)
}

fn cargo_build(config: &BuildConfig, service: &ServiceBinary) -> String {
    let locked = if config.locked { " --locked" } else { "" };
    format!("cargo build --release{locked} --bin {}", service.name)
}

fn sorted_env(config: &BuildConfig) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = config
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    env.sort();
    env
}
