//! Example snippets offered to new users

use serde::Serialize;

/// A canned prompt a client can drop into the input box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Example {
    pub label: &'static str,
    pub text: &'static str,
}

pub const EXAMPLES: [Example; 4] = [
    Example {
        label: "Example: Syntax Error",
        text: "def my_func()\n  print('Hello')\nmy_func()\n# IndentationError: expected an indented block",
    },
    Example {
        label: "Example: KeyError",
        text: "data = {'key': 'value'}\nprint(data['non_existent_key'])",
    },
    Example {
        label: "Example: IndexError",
        text: "numbers = [1, 2, 3]\nfor i in range(4):\n  print(numbers[i])\n# Help me fix the IndexError.",
    },
    Example {
        label: "Example: Sorting Question",
        text: "# This is my Python script to sort a list\nitems = [5, 1, 9, 3]\n# How can I sort this in descending order?",
    },
];
