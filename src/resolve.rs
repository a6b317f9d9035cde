use crate::database::TargetKind;
use crate::duplicates::DuplicateSet;
use crate::settings::ImportSettings;

/// Root of the target project's imported content tree.
pub const CONTENT_ROOT: &str = "/Game";
/// Library subtree for source assets that live outside the exported project
/// (engine built-ins, package content). Never renamed.
pub const LIBRARY_ROOT: &str = "/Game/Utu/Assets";
/// Namespaces the rename policy must not touch.
pub const RESERVED_ROOTS: [&str; 2] = ["/Game/Utu/Assets", "/Game/Utu/Shaders"];
/// Appended to materials that only exist inside a mesh container file and
/// have no standalone source asset.
pub const FBX_MATERIAL_SUFFIX: &str = "_FbxMat";

const UNSAFE_CHARS: &[char] = &[
    ' ', '"', '\'', ',', ':', '|', '&', '!', '~', '@', '#', '(', ')', '{', '}', '[', ']', '=',
    ';', '^', '%', '$', '`', '*', '?', '+',
];

/// Normalized target-engine identifier for one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalName {
    pub directory: String,
    pub base_name: String,
    pub full_path: String,
}

impl CanonicalName {
    /// "No asset" marker; callers treat this as intentionally absent input,
    /// never as a failure.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.full_path.is_empty()
    }

    pub fn from_parts(directory: impl Into<String>, base_name: impl Into<String>) -> Self {
        let directory = directory.into();
        let base_name = base_name.into();
        let full_path = format!("{directory}/{base_name}");
        Self { directory, base_name, full_path }
    }
}

fn split_path(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((dir, base)) => (dir.to_string(), base.to_string()),
        None => (String::new(), path.to_string()),
    }
}

fn collapse_separators(mut path: String) -> String {
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path
}

/// Deterministic source-path to canonical-name mapping. Pure over its
/// inputs: the same path, kind, and duplicate set always resolve to the
/// same triple.
pub struct Resolver<'a> {
    settings: &'a ImportSettings,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a ImportSettings) -> Self {
        Self { settings }
    }

    pub fn resolve(
        &self,
        relative_path: &str,
        kind: TargetKind,
        duplicates: &DuplicateSet,
    ) -> CanonicalName {
        if relative_path.is_empty() {
            return CanonicalName::empty();
        }

        let mut relative = relative_path.to_string();
        if let Some(rest) = relative.strip_prefix("Assets") {
            relative = format!("{CONTENT_ROOT}{rest}");
        } else if let Some(rest) = relative.strip_prefix("Packages") {
            relative = format!("{CONTENT_ROOT}{rest}");
        }
        relative = relative.replace('\\', "/");

        if !relative.starts_with(CONTENT_ROOT) {
            // Content from outside the project tree lands in the library
            // subtree; a "Resources" segment there is redundant.
            relative = format!("{LIBRARY_ROOT}/{}", relative.replace("Resources", ""));
        }

        relative = collapse_separators(relative);
        relative = relative
            .chars()
            .map(|ch| if UNSAFE_CHARS.contains(&ch) { '_' } else { ch })
            .collect();

        if matches!(kind, TargetKind::Material | TargetKind::MaterialInstance)
            && relative.to_ascii_lowercase().ends_with(".fbx")
        {
            relative.truncate(relative.len() - 4);
            relative.push_str(FBX_MATERIAL_SUFFIX);
        }

        let (mut directory, mut base_name) = split_path(&relative);

        if base_name.contains('.') {
            if let Some((stem, _ext)) = base_name.rsplit_once('.') {
                base_name = stem.to_string();
            }
            relative = format!("{directory}/{base_name}").replace('.', "_");
            relative = collapse_separators(relative);
            let split = split_path(&relative);
            directory = split.0;
            base_name = split.1;
        }

        let policy = &self.settings.kind_settings(kind).rename;
        if !RESERVED_ROOTS.iter().any(|root| relative.starts_with(root)) {
            if !base_name.starts_with(&policy.prefix) {
                base_name = format!("{}{}", policy.prefix, base_name);
            }
            if !base_name.ends_with(&policy.suffix) {
                base_name.push_str(&policy.suffix);
            }
            relative = format!("{directory}/{base_name}");
            for rule in &policy.find_and_replace {
                if !rule.find.is_empty() {
                    relative = relative.replace(&rule.find, &rule.replace);
                }
            }
            let split = split_path(&relative);
            directory = split.0;
            base_name = split.1;
        }

        if duplicates.is_marked(relative_path) {
            base_name.push_str(&policy.duplicate_suffix);
        }

        CanonicalName::from_parts(directory, base_name)
    }

    /// Resolves the combined-mesh and split-submesh names together.
    ///
    /// A submesh of a duplicated parent must inherit the parent's already
    /// disambiguated base name: parent "Chair" renamed "Chair_2" makes
    /// "Chair_Leg" resolve to "Chair_2_Leg", not "Chair_Leg_2".
    pub fn resolve_separated(
        &self,
        relative_path: &str,
        separated_path: &str,
        kind: TargetKind,
        duplicates: &DuplicateSet,
    ) -> CanonicalName {
        let combined = self.resolve(relative_path, kind, duplicates);
        let separated = self.resolve(separated_path, kind, duplicates);

        if separated.is_empty() || !duplicates.is_marked(relative_path) {
            return separated;
        }

        let policy = &self.settings.kind_settings(kind).rename;
        let plain_base = combined
            .base_name
            .strip_suffix(&policy.duplicate_suffix)
            .unwrap_or(&combined.base_name);

        let tail = separated
            .base_name
            .strip_prefix(plain_base)
            .unwrap_or(&separated.base_name)
            .to_string();

        CanonicalName::from_parts(separated.directory, format!("{}{}", combined.base_name, tail))
    }
}
