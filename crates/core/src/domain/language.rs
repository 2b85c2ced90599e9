use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    C,
    Go,
    Rust,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::Cpp,
        Language::C,
        Language::Go,
        Language::Rust,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnknownLanguage(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub id: Language,
    pub display_name: String,
    /// Runtime name understood by the sandbox, e.g. `c++` for [`Language::Cpp`].
    pub runtime_id: String,
    pub runtime_version: String,
    pub default_source: String,
}

impl LanguageProfile {
    fn new(
        id: Language,
        display_name: &str,
        runtime_id: &str,
        runtime_version: &str,
        default_source: &str,
    ) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            runtime_id: runtime_id.to_string(),
            runtime_version: runtime_version.to_string(),
            default_source: default_source.to_string(),
        }
    }
}

/// Immutable per-language configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    profiles: HashMap<Language, LanguageProfile>,
}

impl LanguageTable {
    pub fn builtin() -> Self {
        let profiles = [
            LanguageProfile::new(
                Language::Python,
                "Python",
                "python",
                "3.10.0",
                "def main():\n    print(\"Hello, World!\")\n\n\nif __name__ == \"__main__\":\n    main()\n",
            ),
            LanguageProfile::new(
                Language::JavaScript,
                "JavaScript",
                "javascript",
                "18.15.0",
                "function main() {\n  console.log(\"Hello, World!\");\n}\n\nmain();\n",
            ),
            LanguageProfile::new(
                Language::TypeScript,
                "TypeScript",
                "typescript",
                "5.0.3",
                "function main(): void {\n  console.log(\"Hello, World!\");\n}\n\nmain();\n",
            ),
            LanguageProfile::new(
                Language::Java,
                "Java",
                "java",
                "15.0.2",
                "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"Hello, World!\");\n    }\n}\n",
            ),
            LanguageProfile::new(
                Language::Cpp,
                "C++",
                "c++",
                "10.2.0",
                "#include <iostream>\n\nint main() {\n    std::cout << \"Hello, World!\" << std::endl;\n    return 0;\n}\n",
            ),
            LanguageProfile::new(
                Language::C,
                "C",
                "c",
                "10.2.0",
                "#include <stdio.h>\n\nint main(void) {\n    printf(\"Hello, World!\\n\");\n    return 0;\n}\n",
            ),
            LanguageProfile::new(
                Language::Go,
                "Go",
                "go",
                "1.16.2",
                "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"Hello, World!\")\n}\n",
            ),
            LanguageProfile::new(
                Language::Rust,
                "Rust",
                "rust",
                "1.68.2",
                "fn main() {\n    println!(\"Hello, World!\");\n}\n",
            ),
        ];

        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.id, profile))
                .collect(),
        }
    }

    /// Replaces the sandbox runtime version of one language.
    pub fn with_runtime_version(mut self, language: Language, version: impl Into<String>) -> Self {
        if let Some(profile) = self.profiles.get_mut(&language) {
            profile.runtime_version = version.into();
        }
        self
    }

    pub fn get(&self, language: Language) -> Option<&LanguageProfile> {
        self.profiles.get(&language)
    }

    pub fn profile(&self, language: Language) -> Result<&LanguageProfile, DomainError> {
        self.get(language)
            .ok_or_else(|| DomainError::UnknownLanguage(language.to_string()))
    }

    pub fn default_source(&self, language: Language) -> &str {
        self.get(language)
            .map(|profile| profile.default_source.as_str())
            .unwrap_or_default()
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.profiles.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_every_language() {
        let table = LanguageTable::builtin();

        for language in Language::ALL {
            let profile = table.profile(language).expect("profile should exist");
            assert_eq!(profile.id, language);
            assert!(!profile.default_source.is_empty());
        }
    }

    #[test]
    fn cpp_maps_to_sandbox_runtime_name() {
        let table = LanguageTable::builtin();
        assert_eq!(table.profile(Language::Cpp).expect("cpp").runtime_id, "c++");
    }

    #[test]
    fn runtime_version_override_is_applied() {
        let table = LanguageTable::builtin().with_runtime_version(Language::Python, "3.12.0");
        assert_eq!(
            table.profile(Language::Python).expect("python").runtime_version,
            "3.12.0"
        );
    }

    #[test]
    fn language_parses_case_insensitively() {
        assert_eq!("Python".parse::<Language>(), Ok(Language::Python));
        assert_eq!(
            "cobol".parse::<Language>(),
            Err(DomainError::UnknownLanguage("cobol".to_string()))
        );
    }
}
