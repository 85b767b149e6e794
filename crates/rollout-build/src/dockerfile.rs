use crate::descriptor::{BuildDescriptor, BuildStage};

/// Renders a [`BuildDescriptor`] as Dockerfile text.
pub struct DockerfileGenerator<'a> {
    descriptor: &'a BuildDescriptor,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(descriptor: &'a BuildDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn render(&self) -> String {
        let mut out = format!("# {} build descriptor\n", self.descriptor.variant);
        let last = self.descriptor.stages.len().saturating_sub(1);

        for (i, stage) in self.descriptor.stages.iter().enumerate() {
            let label = match (&stage.name, i == last) {
                (Some(name), _) => name.as_str(),
                (None, true) => "runtime",
                (None, false) => "stage",
            };
            out.push_str(&format!("\n# === Stage {}: {label} ===\n", i + 1));
            out.push_str(&render_stage(stage));
        }

        out
    }
}

fn render_stage(stage: &BuildStage) -> String {
    let mut lines = Vec::new();

    match &stage.name {
        Some(name) => lines.push(format!("FROM {} AS {name}", stage.base_image)),
        None => lines.push(format!("FROM {}", stage.base_image)),
    }

    if let Some(workdir) = &stage.workdir {
        lines.push(format!("WORKDIR {workdir}"));
    }

    if !stage.packages.is_empty() {
        lines.push(format!(
            "RUN apt-get update && apt-get install -y {} && rm -rf /var/lib/apt/lists/*",
            stage.packages.join(" ")
        ));
    }

    for copy in &stage.copies {
        match &copy.from_stage {
            Some(from) => lines.push(format!("COPY --from={from} {} {}", copy.src, copy.dest)),
            None => lines.push(format!("COPY {} {}", copy.src, copy.dest)),
        }
    }

    lines.extend(stage.run.iter().map(|command| format!("RUN {command}")));
    lines.extend(
        stage
            .env
            .iter()
            .map(|(key, value)| format!("ENV {key}={}", quote(value))),
    );

    if let Some(port) = stage.expose {
        lines.push(format!("EXPOSE {port}"));
    }

    if !stage.command.is_empty() {
        lines.push(format!("CMD {}", exec_form(&stage.command)));
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

/// JSON array form, so arguments reach the binary without a shell.
fn exec_form(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| quote(a)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
