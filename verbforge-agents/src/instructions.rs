//! Run instructions shown next to the generated code

use crate::design::python_bool;
use crate::layout::OutputLayout;
use crate::types::RequirementSpec;

/// Markdown telling the user how to install, run and test the generated app
pub fn instructions(spec: &RequirementSpec, layout: &OutputLayout) -> String {
    format!(
        r#"# How to Run the Generated Application

## 1. Install Dependencies
```bash
pip install mlconjug3 gradio pytest
```

## 2. Run the Conjugator UI
```bash
cd {conjugator_dir}
python gradio_ui.py
```

## 3. Run the Tests
```bash
cd {tests_dir}
pytest test_conjugator.py -v
```

## Application Features
- Supported Languages: {languages}
- Supported Tenses: {tenses}
- Handles Irregular Verbs: {irregular}

## Usage
1. Open the Gradio interface in your browser
2. Enter a verb to conjugate
3. Select language and tense
4. View the conjugation results
"#,
        languages = spec.languages.join(", "),
        tenses = spec.tenses.join(", "),
        irregular = python_bool(spec.handle_irregular),
        conjugator_dir = layout.conjugator_dir().display(),
        tests_dir = layout.tests_dir().display(),
    )
}
