//! In-memory FTP server used by the integration tests.
//!
//! `MemoryServer` keeps a tree of files and directories plus a log of every
//! command a transport sent. `MemoryConnector` hands out `MemoryTransport`s
//! bound to it, so adapters can be driven end to end without sockets.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use stowage::stowage_ftp::{
    Connector, FtpError, FtpResponse, FtpResult, Transport, TransferMode,
};
use stowage::{ConnectionOptions, FtpAdapter, FtpConnectionProvider};

pub const HOME: &str = "/home/ftp";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const MTIME: i64 = 1_432_382_940;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Unix,
    Windows,
}

#[derive(Debug, Clone)]
enum Node {
    File { contents: Vec<u8>, mode: u32 },
    Directory { mode: u32 },
}

impl Node {
    fn mode(&self) -> u32 {
        match self {
            Node::File { mode, .. } | Node::Directory { mode } => *mode,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }
}

struct ServerState {
    dialect: Dialect,
    nodes: BTreeMap<String, Node>,
    generation: u64,
    commands: Vec<String>,
    opens: usize,
    closes: usize,
    reachable: bool,
    failures: Vec<(String, u16)>,
    syst: String,
    help: String,
    utf8_reply: u16,
    extra_listing_line: Option<String>,
}

impl ServerState {
    fn new(dialect: Dialect) -> Self {
        let mut nodes = BTreeMap::new();
        for dir in ["/", "/home", HOME] {
            nodes.insert(dir.to_string(), Node::Directory { mode: 0o755 });
        }
        Self {
            dialect,
            nodes,
            generation: 0,
            commands: Vec::new(),
            opens: 0,
            closes: 0,
            reachable: true,
            failures: Vec::new(),
            syst: "215 UNIX emulated by MemoryFS".to_string(),
            help: "214 MemoryFS help".to_string(),
            utf8_reply: 200,
            extra_listing_line: None,
        }
    }

    fn is_pure_ftpd(&self) -> bool {
        self.help.contains("Pure-FTPd")
    }

    /// Record `command` and fail it if an injected failure matches.
    fn record(&mut self, command: String) -> FtpResult<()> {
        let failure = self
            .failures
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, code)| *code);
        self.commands.push(command);
        match failure {
            Some(code) => Err(FtpError::from_reply(code, "injected failure")),
            None => Ok(()),
        }
    }

    fn children(&self, dir: &str) -> Vec<(String, Node)> {
        self.nodes
            .iter()
            .filter(|(path, _)| path.as_str() != "/" && parent_of(path) == dir)
            .map(|(path, node)| (path.clone(), node.clone()))
            .collect()
    }

    fn entry_line(&self, name: &str, node: &Node) -> String {
        match (self.dialect, node) {
            (Dialect::Unix, Node::File { contents, mode }) => format!(
                "{}    1 ftp      ftp      {:>8} Aug 19 09:01 {}",
                symbolic_mode('-', *mode),
                contents.len(),
                name
            ),
            (Dialect::Unix, Node::Directory { mode }) => format!(
                "{}    2 ftp      ftp          4096 Aug 19 09:01 {}",
                symbolic_mode('d', *mode),
                name
            ),
            (Dialect::Windows, Node::File { contents, .. }) => {
                format!("05-23-15  12:09PM       {:>14} {}", contents.len(), name)
            }
            (Dialect::Windows, Node::Directory { .. }) => {
                format!("05-23-15  12:09PM       <DIR>          {}", name)
            }
        }
    }

    fn list_directory(&self, dir: &str, recursive: bool, out: &mut Vec<String>) {
        let children = self.children(dir);
        if recursive {
            out.push(format!("{}:", dir));
        }
        if self.dialect == Dialect::Unix {
            out.push(format!("total {}", children.len()));
            let own_mode = self.nodes.get(dir).map(Node::mode).unwrap_or(0o755);
            out.push(self.entry_line(".", &Node::Directory { mode: own_mode }));
            out.push(self.entry_line("..", &Node::Directory { mode: 0o755 }));
        }
        for (path, node) in &children {
            out.push(self.entry_line(name_of(path), node));
        }
        if let Some(extra) = &self.extra_listing_line {
            out.push(extra.clone());
        }
        if recursive {
            for (path, node) in &children {
                if node.is_dir() {
                    out.push(String::new());
                    self.list_directory(path, true, out);
                }
            }
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> bool {
        if !self.nodes.contains_key(from) || !self.is_dir(&parent_of(to)) {
            return false;
        }
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|path| path.as_str() == from || path.starts_with(&format!("{}/", from)))
            .cloned()
            .collect();
        for path in moved {
            if let Some(node) = self.nodes.remove(&path) {
                let target = format!("{}{}", to, &path[from.len()..]);
                self.nodes.insert(target, node);
            }
        }
        true
    }

    fn is_dir(&self, path: &str) -> bool {
        self.nodes.get(path).map(Node::is_dir).unwrap_or(false)
    }

    fn is_file(&self, path: &str) -> bool {
        self.nodes.get(path).map(|n| !n.is_dir()).unwrap_or(false)
    }
}

fn symbolic_mode(kind: char, mode: u32) -> String {
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 4 != 0 { 'r' } else { '-' });
        out.push(if bits & 2 != 0 { 'w' } else { '-' });
        out.push(if bits & 1 != 0 { 'x' } else { '-' });
    }
    out
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => "/".to_string(),
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolve `path` against `cwd`, collapsing `.`, `..` and repeated slashes.
fn resolve(cwd: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

fn unescape(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Shared handle on the in-memory server.
#[derive(Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState::new(dialect))),
        }
    }

    pub fn unix() -> Self {
        Self::new(Dialect::Unix)
    }

    pub fn windows() -> Self {
        Self::new(Dialect::Windows)
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            server: self.clone(),
        }
    }

    pub fn options(&self) -> ConnectionOptions {
        ConnectionOptions::new("memory.test", HOME, USERNAME, PASSWORD)
    }

    pub fn adapter(&self) -> FtpAdapter<FtpConnectionProvider<MemoryConnector>> {
        self.adapter_with(self.options())
    }

    pub fn adapter_with(
        &self,
        options: ConnectionOptions,
    ) -> FtpAdapter<FtpConnectionProvider<MemoryConnector>> {
        FtpAdapter::with_provider(options, FtpConnectionProvider::with_connector(self.connector()))
    }

    // ── Fixtures ─────────────────────────────────────────────────

    /// Add a file (and any missing parents) below the home directory.
    pub fn add_file(&self, path: &str, contents: &[u8]) {
        self.add_file_with_mode(path, contents, 0o644);
    }

    pub fn add_file_with_mode(&self, path: &str, contents: &[u8], mode: u32) {
        let absolute = resolve(HOME, path);
        self.add_dir(&parent_of(&absolute));
        self.lock().nodes.insert(
            absolute,
            Node::File {
                contents: contents.to_vec(),
                mode,
            },
        );
    }

    pub fn add_dir(&self, path: &str) {
        let mut state = self.lock();
        let absolute = resolve(HOME, path);
        let mut current = String::new();
        for part in absolute.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            state
                .nodes
                .entry(current.clone())
                .or_insert(Node::Directory { mode: 0o755 });
        }
    }

    pub fn remove_home(&self) {
        self.lock().nodes.retain(|path, _| !path.starts_with(HOME));
    }

    // ── Inspection ───────────────────────────────────────────────

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().nodes.get(&resolve(HOME, path)) {
            Some(Node::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.lock().nodes.get(&resolve(HOME, path)).map(Node::mode)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.lock().is_file(&resolve(HOME, path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.lock().is_dir(&resolve(HOME, path))
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// Commands whose text starts with `prefix`.
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    // ── Behaviour switches ───────────────────────────────────────

    /// Invalidate every transport opened so far.
    pub fn kill_connections(&self) {
        self.lock().generation += 1;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Fail every command starting with `prefix` with `code`.
    pub fn fail(&self, prefix: &str, code: u16) {
        self.lock().failures.push((prefix.to_string(), code));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn set_syst(&self, reply: &str) {
        self.lock().syst = reply.to_string();
    }

    pub fn set_help(&self, reply: &str) {
        self.lock().help = reply.to_string();
    }

    pub fn set_utf8_reply(&self, code: u16) {
        self.lock().utf8_reply = code;
    }

    pub fn set_extra_listing_line(&self, line: &str) {
        self.lock().extra_listing_line = Some(line.to_string());
    }
}

pub struct MemoryConnector {
    server: MemoryServer,
}

impl MemoryConnector {
    pub fn server(&self) -> &MemoryServer {
        &self.server
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn open(
        &self,
        host: &str,
        port: u16,
        _ssl: bool,
        _timeout: Duration,
    ) -> FtpResult<MemoryTransport> {
        let mut state = self.server.lock();
        if !state.reachable {
            return Err(FtpError::connection_failed(format!(
                "{}:{} refused the connection",
                host, port
            )));
        }
        state.opens += 1;
        Ok(MemoryTransport {
            server: self.server.clone(),
            generation: state.generation,
            cwd: "/".to_string(),
            logged_in: false,
        })
    }
}

pub struct MemoryTransport {
    server: MemoryServer,
    generation: u64,
    cwd: String,
    logged_in: bool,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("generation", &self.generation)
            .field("cwd", &self.cwd)
            .field("logged_in", &self.logged_in)
            .finish_non_exhaustive()
    }
}

impl MemoryTransport {
    /// Lock the server, failing when this transport has been killed.
    fn session(&self) -> FtpResult<MutexGuard<'_, ServerState>> {
        let state = self.server.lock();
        if state.generation != self.generation {
            return Err(FtpError::disconnected("connection reset by peer"));
        }
        Ok(state)
    }

    fn resolve(&self, path: &str) -> String {
        resolve(&self.cwd, path)
    }

    fn not_found(path: &str) -> FtpError {
        FtpError::from_reply(550, &format!("{}: No such file or directory", path))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn login(&mut self, username: &str, password: &str) -> FtpResult<()> {
        let mut state = self.session()?;
        state.record(format!("USER {}", username))?;
        if username != USERNAME || password != PASSWORD {
            return Err(FtpError::from_reply(530, "Login incorrect."));
        }
        drop(state);
        self.logged_in = true;
        self.cwd = HOME.to_string();
        Ok(())
    }

    async fn raw(&mut self, command: &str) -> FtpResult<FtpResponse> {
        let cwd = self.cwd.clone();
        let mut state = self.session()?;
        state.record(command.to_string())?;

        let (verb, argument) = match command.split_once(' ') {
            Some((verb, argument)) => (verb.to_ascii_uppercase(), argument.to_string()),
            None => (command.to_ascii_uppercase(), String::new()),
        };
        let response = match verb.as_str() {
            "NOOP" => FtpResponse::new(200, vec!["200 NOOP ok.".to_string()]),
            "OPTS" => {
                let code = state.utf8_reply;
                FtpResponse::new(code, vec![format!("{} UTF8 mode", code)])
            }
            "SYST" => FtpResponse::new(215, vec![state.syst.clone()]),
            "HELP" => FtpResponse::new(214, vec![state.help.clone()]),
            "STAT" => {
                let argument = if state.is_pure_ftpd() {
                    unescape(&argument)
                } else {
                    argument
                };
                let path = resolve(&cwd, &argument);
                let mut lines = vec![format!("213-Status of {}:", argument)];
                if let Some(node) = state.nodes.get(&path) {
                    lines.push(format!(" {}", state.entry_line(name_of(&path), node)));
                }
                lines.push("213 End of status".to_string());
                FtpResponse::new(213, lines)
            }
            _ => FtpResponse::new(502, vec![format!("502 {} not implemented.", verb)]),
        };
        Ok(response)
    }

    async fn chdir(&mut self, path: &str) -> FtpResult<()> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("CWD {}", path))?;
        if !state.is_dir(&target) {
            return Err(Self::not_found(path));
        }
        drop(state);
        self.cwd = target;
        Ok(())
    }

    async fn pwd(&mut self) -> FtpResult<String> {
        let mut state = self.session()?;
        state.record("PWD".to_string())?;
        Ok(self.cwd.clone())
    }

    async fn set_passive(&mut self, passive: bool) -> FtpResult<()> {
        self.session()?.record(format!("PASSIVE {}", passive))
    }

    async fn set_use_passive_address(&mut self, enabled: bool) -> FtpResult<()> {
        self.session()?.record(format!("USEPASVADDRESS {}", enabled))
    }

    async fn raw_list(&mut self, argument: &str) -> FtpResult<Vec<String>> {
        let cwd = self.cwd.clone();
        let mut state = self.session()?;
        state.record(format!("LIST {}", argument))?;

        let (options, location) = match argument.split_once(' ') {
            Some((options, location)) if options.starts_with('-') => (options, location),
            _ => ("", argument),
        };
        let location = if state.is_pure_ftpd() {
            unescape(location)
        } else {
            location.to_string()
        };
        let path = resolve(&cwd, &location);

        let mut lines = Vec::new();
        match state.nodes.get(&path) {
            Some(Node::Directory { .. }) => {
                state.list_directory(&path, options.contains('R'), &mut lines)
            }
            Some(node) => lines.push(state.entry_line(name_of(&path), node)),
            None => return Err(FtpError::from_reply(450, "No such file or directory")),
        }
        Ok(lines)
    }

    async fn get(&mut self, path: &str, _mode: TransferMode) -> FtpResult<Vec<u8>> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("RETR {}", path))?;
        match state.nodes.get(&target) {
            Some(Node::File { contents, .. }) => Ok(contents.clone()),
            _ => Err(Self::not_found(path)),
        }
    }

    async fn put(&mut self, path: &str, contents: &[u8], _mode: TransferMode) -> FtpResult<()> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("STOR {}", path))?;
        if !state.is_dir(&parent_of(&target)) || state.is_dir(&target) {
            return Err(FtpError::from_reply(553, "Could not create file."));
        }
        let mode = state.nodes.get(&target).map(Node::mode).unwrap_or(0o644);
        state.nodes.insert(
            target,
            Node::File {
                contents: contents.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    async fn size(&mut self, path: &str) -> FtpResult<u64> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("SIZE {}", path))?;
        match state.nodes.get(&target) {
            Some(Node::File { contents, .. }) => Ok(contents.len() as u64),
            _ => Err(Self::not_found(path)),
        }
    }

    async fn mdtm(&mut self, path: &str) -> FtpResult<i64> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("MDTM {}", path))?;
        if state.is_file(&target) {
            Ok(MTIME)
        } else {
            Err(Self::not_found(path))
        }
    }

    async fn delete(&mut self, path: &str) -> FtpResult<()> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("DELE {}", path))?;
        if !state.is_file(&target) {
            return Err(Self::not_found(path));
        }
        state.nodes.remove(&target);
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        let (source, target) = (self.resolve(from), self.resolve(to));
        let mut state = self.session()?;
        state.record(format!("RNFR {}", from))?;
        state.record(format!("RNTO {}", to))?;
        if state.rename(&source, &target) {
            Ok(())
        } else {
            Err(FtpError::from_reply(550, ""))
        }
    }

    async fn mkdir(&mut self, path: &str) -> FtpResult<String> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("MKD {}", path))?;
        if !state.is_dir(&parent_of(&target)) || state.nodes.contains_key(&target) {
            return Err(FtpError::from_reply(550, "Can't create directory: File exists"));
        }
        state
            .nodes
            .insert(target.clone(), Node::Directory { mode: 0o755 });
        Ok(target)
    }

    async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("RMD {}", path))?;
        if !state.is_dir(&target) || !state.children(&target).is_empty() {
            return Err(FtpError::from_reply(550, "Directory not empty"));
        }
        state.nodes.remove(&target);
        Ok(())
    }

    async fn chmod(&mut self, mode: u32, path: &str) -> FtpResult<()> {
        let target = self.resolve(path);
        let mut state = self.session()?;
        state.record(format!("SITE CHMOD {:o} {}", mode, path))?;
        match state.nodes.get_mut(&target) {
            Some(Node::File { mode: current, .. }) | Some(Node::Directory { mode: current }) => {
                *current = mode;
                Ok(())
            }
            None => Err(Self::not_found(path)),
        }
    }

    async fn close(&mut self) {
        let mut state = self.server.lock();
        state.commands.push("QUIT".to_string());
        state.closes += 1;
    }
}
