use camino::{Utf8Path, Utf8PathBuf};
use std::ffi::OsString;
use std::fmt;

/// Flags always passed to the build-configuration tool, in this order.
pub const FIXED_BUILD_FLAGS: [&str; 3] = [
    "-DCMAKE_BUILD_TYPE=Release",
    "-DUSE_STACKTRACE=ON",
    "-DBUILD_LINK_MODE=HYBRID",
];

/// Flag requesting extended-precision (`__float128`) support.
pub const EXTENDED_PRECISION_FLAG: &str = "-DFLOAT128=ON";

/// A matched C / C++ compiler pair, by command name.
///
/// A pair is only ever produced whole: the locator either returns both names
/// or nothing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolchainRef {
    pub cc: String,
    pub cxx: String,
}

impl ToolchainRef {
    pub fn new(cc: impl Into<String>, cxx: impl Into<String>) -> Self {
        Self {
            cc: cc.into(),
            cxx: cxx.into(),
        }
    }

    /// The generic `gcc`/`g++` pair.
    pub fn gcc() -> Self {
        Self::new("gcc", "g++")
    }

    /// Whether the pair is driven by the generic `gcc` name.
    ///
    /// A gcc pair is assumed to support extended precision.
    pub fn is_gcc(&self) -> bool {
        self.cc == "gcc"
    }
}

impl fmt::Display for ToolchainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cc, self.cxx)
    }
}

/// Environment overrides produced by toolchain setup and handed to every
/// later command.
///
/// The host process environment is never mutated; each spawned command gets
/// these as per-process variables instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolchainContext {
    /// Directories placed in front of `PATH`, highest priority first
    pub path_prepend: Vec<Utf8PathBuf>,

    /// Explicit C compiler executable (exported as `CC`)
    pub cc: Option<Utf8PathBuf>,

    /// Explicit C++ compiler executable (exported as `CXX`)
    pub cxx: Option<Utf8PathBuf>,
}

impl ToolchainContext {
    /// Context for a toolchain installed under `bin_dir`.
    pub fn for_install(bin_dir: &Utf8Path) -> Self {
        Self {
            path_prepend: vec![bin_dir.to_path_buf()],
            cc: Some(bin_dir.join(exe_name("gcc"))),
            cxx: Some(bin_dir.join(exe_name("g++"))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path_prepend.is_empty() && self.cc.is_none() && self.cxx.is_none()
    }

    /// Compiler names to hand to the configuration tool.
    ///
    /// Explicit executables from the context win over the pair's names.
    pub fn compiler_names(&self, toolchain: &ToolchainRef) -> (String, String) {
        let cc = self
            .cc
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| toolchain.cc.clone());
        let cxx = self
            .cxx
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| toolchain.cxx.clone());
        (cc, cxx)
    }

    /// The search path a spawned command should see, if it differs from ours.
    pub fn search_path(&self) -> Option<OsString> {
        if self.path_prepend.is_empty() {
            return None;
        }

        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .path_prepend
            .iter()
            .map(|d| d.as_std_path().to_path_buf())
            .chain(std::env::split_paths(&inherited));

        match std::env::join_paths(dirs) {
            Ok(joined) => Some(joined),
            Err(e) => {
                tracing::warn!("Cannot prepend toolchain dirs to PATH: {}", e);
                None
            }
        }
    }

    /// Variables to set on each spawned command.
    pub fn env_overrides(&self) -> Vec<(String, OsString)> {
        let mut vars = Vec::new();

        if let Some(path) = self.search_path() {
            vars.push(("PATH".to_string(), path));
        }
        if let Some(cc) = &self.cc {
            vars.push(("CC".to_string(), OsString::from(cc.as_str())));
        }
        if let Some(cxx) = &self.cxx {
            vars.push(("CXX".to_string(), OsString::from(cxx.as_str())));
        }

        vars
    }
}

fn exe_name(stem: &str) -> String {
    format!("{}{}", stem, std::env::consts::EXE_SUFFIX)
}

/// Ordered flags for the build-configuration tool.
///
/// Fixed flags come first, then extended precision, then explicit compilers.
/// Order matters: later duplicates override earlier ones in cmake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildFlags(Vec<String>);

impl BuildFlags {
    pub fn new(extended_precision: bool, compilers: Option<(&str, &str)>) -> Self {
        let mut flags: Vec<String> = FIXED_BUILD_FLAGS.iter().map(|f| f.to_string()).collect();

        if extended_precision {
            flags.push(EXTENDED_PRECISION_FLAG.to_string());
        }
        if let Some((cc, cxx)) = compilers {
            flags.push(format!("-DCMAKE_C_COMPILER={}", cc));
            flags.push(format!("-DCMAKE_CXX_COMPILER={}", cxx));
        }

        Self(flags)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.0.iter().any(|f| f == flag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_flags_only() {
        let flags = BuildFlags::new(false, None);
        assert_eq!(flags.as_slice(), FIXED_BUILD_FLAGS);
    }

    #[test]
    fn test_derived_flag_order() {
        let flags = BuildFlags::new(true, Some(("gcc", "g++")));

        assert_eq!(
            &flags.as_slice()[3..],
            [
                "-DFLOAT128=ON",
                "-DCMAKE_C_COMPILER=gcc",
                "-DCMAKE_CXX_COMPILER=g++",
            ]
        );
    }

    #[test]
    fn test_context_names_override_pair() {
        let ctx = ToolchainContext::for_install(Utf8Path::new("/opt/gcc/bin"));
        let (cc, cxx) = ctx.compiler_names(&ToolchainRef::gcc());

        assert!(cc.starts_with("/opt/gcc/bin"));
        assert!(cxx.contains("g++"));
    }

    #[test]
    fn test_empty_context_uses_pair_names() {
        let ctx = ToolchainContext::default();
        assert!(ctx.is_empty());
        assert!(ctx.env_overrides().is_empty());

        let pair = ToolchainRef::new("clang", "clang++");
        assert_eq!(ctx.compiler_names(&pair), ("clang".to_string(), "clang++".to_string()));
    }

    #[test]
    fn test_install_context_exports_compilers() {
        let ctx = ToolchainContext::for_install(Utf8Path::new("/opt/gcc/bin"));
        let vars = ctx.env_overrides();

        let keys: Vec<&str> = vars.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["PATH", "CC", "CXX"]);

        let path = ctx.search_path().unwrap();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, std::path::PathBuf::from("/opt/gcc/bin"));
    }

    #[test]
    fn test_is_gcc() {
        assert!(ToolchainRef::gcc().is_gcc());
        assert!(!ToolchainRef::new("clang", "clang++").is_gcc());
    }

    proptest! {
        #[test]
        fn test_fixed_flags_always_lead(
            extended in any::<bool>(),
            compilers in proptest::option::of(("[a-z+]{1,8}", "[a-z+]{1,8}")),
        ) {
            let flags = BuildFlags::new(
                extended,
                compilers.as_ref().map(|(cc, cxx)| (cc.as_str(), cxx.as_str())),
            );

            prop_assert_eq!(&flags.as_slice()[..3], &FIXED_BUILD_FLAGS[..]);
            prop_assert_eq!(flags.contains(EXTENDED_PRECISION_FLAG), extended);
            prop_assert_eq!(flags.len(), 3 + usize::from(extended) + 2 * usize::from(compilers.is_some()));
        }
    }
}
