//! Built-in prompt templates

use super::{Category, Priority};

pub(super) struct BuiltinTemplate {
    pub id: &'static str,
    pub category: Category,
    pub title: &'static str,
    pub description: &'static str,
    pub priority: Priority,
    pub body: &'static str,
}

pub(super) const BUILTIN: &[BuiltinTemplate] = &[
    BuiltinTemplate {
        id: "universal-startup",
        category: Category::Startup,
        title: "Universal project kickoff",
        description: "Complete kickoff prompt for complex projects",
        priority: Priority::High,
        body: "I want to build a [project type] that [core problem it solves].

Project background:
- Target users: [users and usage scenarios]
- Pain points: [current problems]
- Expected outcome: [what a good solution looks like]

Initial ideas:
- [idea 1]
- [idea 2]
- [idea 3]

Constraints:
- Time: [schedule]
- Technology: [preferred or required stack]
- Resources: [people and budget]

Act as a product manager and ask focused questions to help me:
1. Refine the requirements
2. Check technical feasibility
3. Draft a development plan
4. Plan the implementation steps",
    },
    BuiltinTemplate {
        id: "web-app-quick",
        category: Category::Startup,
        title: "Web app, quick version",
        description: "Fast start for a web project",
        priority: Priority::Medium,
        body: "Web project: [feature description]
Users: [user type]
Stack: [frontend] + [backend] + [database]
What details do you need from me?",
    },
    BuiltinTemplate {
        id: "mobile-app-quick",
        category: Category::Startup,
        title: "Mobile app, quick version",
        description: "Fast start for a mobile app",
        priority: Priority::Medium,
        body: "Mobile app: [core feature]
Platform: [iOS / Android / cross-platform]
Users: [user type]
Key screens: [screen list]
What should we clarify first?",
    },
    BuiltinTemplate {
        id: "tool-dev-quick",
        category: Category::Startup,
        title: "Utility tool, quick version",
        description: "Fast start for a small tool",
        priority: Priority::Medium,
        body: "I want to build a tool that [what it automates].
Input: [input format]
Output: [output format]
Runs on: [environment]
Suggest a minimal first version.",
    },
    BuiltinTemplate {
        id: "bug-report",
        category: Category::Problem,
        title: "Complete bug report",
        description: "Structured problem report",
        priority: Priority::High,
        body: "Problem description: [what goes wrong]

Environment:
- System: [OS and version]
- Runtime: [language and version]
- Dependencies: [relevant libraries]

Steps to reproduce:
1. [step 1]
2. [step 2]
3. [step 3]

Expected behavior: [what should happen]
Actual behavior: [what happens instead]

Error message:
[full error output]

Already tried:
- [attempt 1]
- [attempt 2]

Please help me analyze the root cause and propose a fix.",
    },
    BuiltinTemplate {
        id: "performance-optimization",
        category: Category::Problem,
        title: "Performance quick check",
        description: "Diagnose a performance problem",
        priority: Priority::Medium,
        body: "Slow part: [feature or endpoint]
Current numbers: [latency / memory / CPU]
Target: [goal]
Data size: [volume]
Please find the bottleneck and rank the optimizations by impact.",
    },
    BuiltinTemplate {
        id: "code-review",
        category: Category::Problem,
        title: "Code review quick check",
        description: "Review code quality",
        priority: Priority::Medium,
        body: "Please review this code for [correctness / readability / security]:

[code]

Context: [what it is for]
Focus on: [specific concerns]",
    },
    BuiltinTemplate {
        id: "tech-comparison",
        category: Category::Advanced,
        title: "Technology comparison",
        description: "Systematic comparison of technical options",
        priority: Priority::High,
        body: "I need to choose between [option A] and [option B] for [use case].

Requirements:
- Scale: [expected load]
- Team: [experience with each option]
- Timeline: [deadline]

Compare them on:
1. Performance
2. Learning curve
3. Ecosystem and community
4. Long-term maintenance
5. Cost

Finish with a recommendation and the risks of each choice.",
    },
    BuiltinTemplate {
        id: "architecture-design",
        category: Category::Advanced,
        title: "Architecture design guide",
        description: "Guided system architecture design",
        priority: Priority::High,
        body: "Help me design the architecture for [system name].

Business goals: [goals]
Core features: [feature list]
Non-functional requirements:
- Availability: [target]
- Latency: [target]
- Data volume: [estimate]

Please cover module boundaries, data flow, storage choices and deployment, and point out the parts most likely to change.",
    },
    BuiltinTemplate {
        id: "team-collaboration",
        category: Category::Advanced,
        title: "Team collaboration",
        description: "Working agreements for a team project",
        priority: Priority::Medium,
        body: "Team size: [number] people, roles: [roles]
Project: [project summary]
Current friction: [problems]
Please propose branching, review and communication conventions we can adopt this week.",
    },
    BuiltinTemplate {
        id: "memory-enhanced",
        category: Category::NewFeatures,
        title: "Memory-enhanced kickoff",
        description: "Kickoff that combines Memory and slash commands",
        priority: Priority::High,
        body: "# Project memory
- Project: [project name]
- Stack: [stack]
- Conventions: [coding conventions]

/init
Read the project memory above, then help me [task]. Record any new decisions back into Memory.",
    },
    BuiltinTemplate {
        id: "ide-integration",
        category: Category::NewFeatures,
        title: "IDE integration session",
        description: "Real-time collaboration inside the IDE",
        priority: Priority::Medium,
        body: "I'm working in [IDE] on [file or module].
Current selection: [selected code]
Goal: [what to change]
Use the IDE diagnostics to check your edits before proposing them.",
    },
    BuiltinTemplate {
        id: "agent-analysis",
        category: Category::NewFeatures,
        title: "Agent deep analysis",
        description: "Delegate a focused analysis to an Agent",
        priority: Priority::Medium,
        body: "Start an Agent to analyze [codebase area].
Questions to answer:
1. [question 1]
2. [question 2]
Report: findings, affected files and a suggested plan. Do not modify code.",
    },
];
