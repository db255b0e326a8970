use super::defaults::{
    DEFAULT_ENGINE_CMD, ENGINE_ALLOWLIST, MAX_ENGINE_ARGS, MAX_ENGINE_ARG_BYTES,
};
use super::{RouterConfig, MAX_QUERY_ROUNDS_LIMIT, MAX_ROUTER_TIMEOUT_MS, MIN_ROUTER_TIMEOUT_MS};
use crate::keys::KeyStroke;
use crate::router::EngineCommand;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

impl RouterConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the engine path.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_ROUTER_TIMEOUT_MS..=MAX_ROUTER_TIMEOUT_MS).contains(&self.router_timeout_ms) {
            bail!(
                "--router-timeout-ms must be between {MIN_ROUTER_TIMEOUT_MS} and {MAX_ROUTER_TIMEOUT_MS}, got {}",
                self.router_timeout_ms
            );
        }
        if !(1..=MAX_QUERY_ROUNDS_LIMIT).contains(&self.max_query_rounds) {
            bail!(
                "--max-query-rounds must be between 1 and {MAX_QUERY_ROUNDS_LIMIT}, got {}",
                self.max_query_rounds
            );
        }

        self.engine_cmd = sanitize_binary(&self.engine_cmd, "--engine-cmd", ENGINE_ALLOWLIST)?;

        let args = self.engine_argv()?;
        if args.len() > MAX_ENGINE_ARGS {
            bail!(
                "--engine-args has too many arguments (max {MAX_ENGINE_ARGS}, got {})",
                args.len()
            );
        }
        let total_arg_bytes: usize = args.iter().map(String::len).sum();
        if total_arg_bytes > MAX_ENGINE_ARG_BYTES {
            bail!("combined --engine-args length exceeds {MAX_ENGINE_ARG_BYTES} bytes");
        }

        self.insert_triggers()?;
        let reserved = self.reserved_shortcuts()?;
        if reserved.iter().any(|stroke| stroke.modifiers.is_empty()) {
            bail!("--reserved-shortcut entries need at least one modifier (e.g. <C-d>)");
        }

        if self
            .eligible_window_classes
            .iter()
            .any(|class| class.trim().is_empty())
        {
            bail!("--eligible-window-class must not be empty");
        }

        Ok(())
    }

    /// Keystrokes forwarded to the engine while in insert mode.
    pub fn insert_triggers(&self) -> Result<Vec<KeyStroke>> {
        parse_keystrokes(&self.insert_trigger, "--insert-trigger")
    }

    /// Menu key-equivalents suppressed in command mode.
    pub fn reserved_shortcuts(&self) -> Result<Vec<KeyStroke>> {
        parse_keystrokes(&self.reserved_shortcut, "--reserved-shortcut")
    }

    /// Program + argv for spawning the decision engine.
    ///
    /// The bare default name resolves to a binary sitting next to the running
    /// executable when there is one, so a fresh build works without touching PATH.
    pub fn engine_command(&self) -> Result<EngineCommand> {
        let args = self.engine_argv()?;
        let program = if self.engine_cmd == DEFAULT_ENGINE_CMD {
            sibling_binary(DEFAULT_ENGINE_CMD)
                .map(|path| path.to_string_lossy().to_string())
                .unwrap_or_else(|| self.engine_cmd.clone())
        } else {
            self.engine_cmd.clone()
        };
        Ok(EngineCommand::new(program, args))
    }

    fn engine_argv(&self) -> Result<Vec<String>> {
        match self.engine_args.as_deref() {
            None => Ok(Vec::new()),
            Some(raw) => shell_words::split(raw)
                .with_context(|| format!("--engine-args is not valid shell syntax: '{raw}'")),
        }
    }
}

fn parse_keystrokes(values: &[String], flag: &str) -> Result<Vec<KeyStroke>> {
    values
        .iter()
        .map(|value| {
            KeyStroke::parse(value.trim())
                .with_context(|| format!("{flag} has an invalid keystroke '{value}'"))
        })
        .collect()
}

pub(super) fn sibling_binary(name: &str) -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir = exe.parent()?;
    // Test binaries live one level below the real ones (target/<profile>/deps).
    let found = [Some(dir), dir.parent()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(format!("{name}{}", env::consts::EXE_SUFFIX)))
        .find(|candidate| candidate.is_file());
    found
}

/// Allow either a known binary name or an existing executable path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
        let metadata = fs::metadata(&canonical)
            .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
        if !metadata.is_file() {
            bail!("{flag} '{}' is not a file", canonical.display());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                bail!(
                    "{flag} '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        return canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"));
    }

    bail!("{flag} must be one of {allowlist:?} or an existing binary path");
}
